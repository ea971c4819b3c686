//! Spot analyses to sample averages in one run.
//!
//! raw composition -> cation quality check -> area means -> formula on area
//! means -> sample means -> formula on sample means.

use super::averaging::{AggregatedTable, average_over_areas, average_over_samples};
use super::composition::{CompositionResult, compose};
use super::quality::{QualityFilter, QualityFilterOptions, QualityOutcome};
use super::report::{ReportTable, aggregated_report, composition_report};
use super::summary::{SampleRatioSummary, summarize_ratios};
use super::traits::DecisionSource;
use crate::domain::{EpmaResult, MeasurementTable, MineralClass};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub quality: QualityFilterOptions,
}

/// Averages at one level together with the formula recomputed on them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageResult {
    pub averages: AggregatedTable,
    pub composition: CompositionResult,
}

impl StageResult {
    fn from_averages(averages: AggregatedTable, mineral: MineralClass) -> Self {
        let composition = compose(&averages.to_measurements(), mineral);
        Self {
            averages,
            composition,
        }
    }

    pub fn report(&self) -> ReportTable {
        aggregated_report(&self.averages, &self.composition)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    pub mineral: MineralClass,
    pub raw: CompositionResult,
    pub quality: QualityOutcome,
    pub areas: StageResult,
    pub samples: StageResult,
    pub ratio_summary: Vec<SampleRatioSummary>,
}

impl PipelineOutcome {
    /// Spot, area and sample tables, in that order.
    pub fn reports(&self) -> Vec<ReportTable> {
        vec![
            composition_report(&self.quality.composition),
            self.areas.report(),
            self.samples.report(),
        ]
    }
}

pub fn run_pipeline<S>(
    measurements: &MeasurementTable,
    mineral: MineralClass,
    source: &mut S,
    options: &PipelineOptions,
) -> EpmaResult<PipelineOutcome>
where
    S: DecisionSource + ?Sized,
{
    info!(mineral = %mineral, spots = measurements.len(), "starting formula pipeline");
    if measurements.is_empty() {
        warn!("no spot analyses survived ingestion");
    }

    let raw = compose(measurements, mineral);
    let quality = QualityFilter::new(options.quality).run(measurements, &raw, source)?;

    let areas = StageResult::from_averages(average_over_areas(&quality.measurements), mineral);
    let samples = StageResult::from_averages(average_over_samples(&areas.averages)?, mineral);
    let ratio_summary = summarize_ratios(&areas.composition);

    info!(
        kept = quality.measurements.len(),
        areas = areas.averages.len(),
        samples = samples.averages.len(),
        "formula pipeline finished"
    );

    Ok(PipelineOutcome {
        mineral,
        raw,
        quality,
        areas,
        samples,
        ratio_summary,
    })
}
