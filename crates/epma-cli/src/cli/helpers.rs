use super::CliError;
use super::config::Config;
use epma_core::domain::{EpmaError, MeasurementTable, MineralClass};
use epma_core::modules::ingest::{IngestReport, read_measurements_path};
use epma_core::modules::quality::QualityFilterOptions;
use std::fs;
use std::path::Path;
use tracing::info;

pub(super) fn load_config(path: Option<&Path>) -> Result<Config, CliError> {
    match path {
        Some(path) => Ok(Config::from_file(path)?),
        None => Ok(Config::default()),
    }
}

pub(super) fn parse_mineral(name: &str) -> Result<MineralClass, CliError> {
    Ok(MineralClass::parse(name)?)
}

pub(super) fn load_measurements(
    input: &Path,
    config: &Config,
) -> Result<MeasurementTable, CliError> {
    let IngestReport {
        table,
        records_read,
        dropped_incomplete,
        dropped_total,
    } = read_measurements_path(input, &config.ingest_options()).map_err(EpmaError::from)?;
    info!(
        input = %input.display(),
        records_read,
        dropped_incomplete,
        dropped_total,
        kept = table.len(),
        "loaded spot analyses"
    );
    Ok(table)
}

/// Flags win over the config file, which wins over the built-in defaults.
pub(super) fn quality_options(
    config: &Config,
    tolerance: Option<f64>,
    max_prompts: Option<usize>,
) -> Result<QualityFilterOptions, CliError> {
    let defaults = QualityFilterOptions::default();
    let tolerance = tolerance
        .or(config.quality.tolerance)
        .unwrap_or(defaults.tolerance);
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(CliError::Usage(format!(
            "tolerance must be a finite, non-negative number, got {tolerance}"
        )));
    }
    Ok(QualityFilterOptions {
        tolerance,
        max_prompts: max_prompts.or(config.quality.max_prompts),
    })
}

pub(super) fn ensure_directory(path: &Path) -> Result<(), CliError> {
    fs::create_dir_all(path).map_err(|source| {
        CliError::Compute(EpmaError::io_system(
            "IO.CLI_OUTPUT_DIRECTORY",
            format!(
                "failed to create output directory '{}': {}",
                path.display(),
                source
            ),
        ))
    })
}
