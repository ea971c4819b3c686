//! TOML configuration for runs that always use the same export layout:
//!
//! ```toml
//! # epma.toml
//! [columns]
//! sample = "Project Path (2)"
//! area = "Project Path (3)"
//!
//! [filter]
//! total_min = 98.5
//! total_max = 101.5
//!
//! [quality]
//! tolerance = 0.02
//! max_prompts = 20
//! ```
//!
//! Command-line flags override anything set here.

use anyhow::{Context, Result};
use epma_core::modules::ingest::{ColumnNames, IngestOptions, TotalFilter};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub(super) struct Config {
    #[serde(default)]
    pub(super) columns: ColumnNames,

    #[serde(default)]
    pub(super) filter: TotalFilter,

    #[serde(default)]
    pub(super) quality: QualityConfig,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct QualityConfig {
    /// Starting half-width of the accepted cation-sum window.
    pub(super) tolerance: Option<f64>,

    pub(super) max_prompts: Option<usize>,
}

impl Config {
    pub(super) fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    pub(super) fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    pub(super) fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            columns: self.columns.clone(),
            filter: self.filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn full_config_overrides_defaults() {
        let toml = r#"
            [columns]
            sample = "Sample"
            area = "Area"

            [filter]
            total_min = 98.5

            [quality]
            tolerance = 0.02
            max_prompts = 20
        "#;

        let config = Config::from_str(toml).expect("config should parse");
        assert_eq!(config.columns.sample, "Sample");
        assert_eq!(config.columns.total, "Total");
        assert_eq!(config.filter.total_min, 98.5);
        assert_eq!(config.filter.total_max, 101.0);
        assert_eq!(config.quality.tolerance, Some(0.02));
        assert_eq!(config.quality.max_prompts, Some(20));
    }

    #[test]
    fn empty_config_keeps_export_defaults() {
        let config = Config::from_str("").expect("empty config should parse");
        let options = config.ingest_options();
        assert_eq!(options.columns.sample, "Project Path (2)");
        assert_eq!(options.columns.area, "Project Path (3)");
        assert_eq!(options.filter.total_min, 99.0);
        assert_eq!(config.quality.tolerance, None);
    }

    #[test]
    fn malformed_config_is_rejected() {
        assert!(Config::from_str("[quality]\ntolerance = \"wide\"").is_err());
    }
}
