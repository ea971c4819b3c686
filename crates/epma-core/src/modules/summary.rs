//! Per-sample ratio statistics and the min/max envelopes plotted from them.

use super::averaging::group_in_order;
use super::composition::CompositionResult;
use super::ratios::{MineralRatios, ratio_uncertainty};
use crate::numerics::{mean, min_max};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioStatistics {
    pub name: &'static str,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub two_sd: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRatioSummary {
    pub sample: String,
    pub count: usize,
    pub ratios: Vec<RatioStatistics>,
}

impl SampleRatioSummary {
    pub fn ratio(&self, name: &str) -> Option<&RatioStatistics> {
        self.ratios.iter().find(|statistics| statistics.name == name)
    }
}

pub fn summarize_ratios(composition: &CompositionResult) -> Vec<SampleRatioSummary> {
    let rows = composition.rows();
    group_in_order(rows, |row| row.sample.clone())
        .into_iter()
        .map(|(sample, members)| {
            let ratios: Vec<MineralRatios> =
                members.iter().map(|&member| rows[member].ratios).collect();
            let statistics = ratio_uncertainty(&ratios)
                .into_iter()
                .map(|spread| {
                    let column: Vec<f64> = ratios
                        .iter()
                        .map(|ratio| ratio.get(spread.name).unwrap_or(f64::NAN))
                        .collect();
                    let (min, max) = min_max(&column).unwrap_or((f64::NAN, f64::NAN));
                    RatioStatistics {
                        name: spread.name,
                        mean: mean(&column),
                        min,
                        max,
                        two_sd: spread.two_sd,
                        delta: spread.delta,
                    }
                })
                .collect();

            SampleRatioSummary {
                sample,
                count: members.len(),
                ratios: statistics,
            }
        })
        .collect()
}

/// Rectangle spanned by one sample's x and y ratio ranges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioEnvelope {
    pub sample: String,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl RatioEnvelope {
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

/// Joins two summaries on sample name, keeping the order of `x`. Samples
/// missing from either side are left out.
pub fn pair_envelopes(
    x: &[SampleRatioSummary],
    x_ratio: &str,
    y: &[SampleRatioSummary],
    y_ratio: &str,
) -> Vec<RatioEnvelope> {
    x.iter()
        .filter_map(|x_summary| {
            let x_statistics = x_summary.ratio(x_ratio)?;
            let y_statistics = y
                .iter()
                .find(|candidate| candidate.sample == x_summary.sample)?
                .ratio(y_ratio)?;
            Some(RatioEnvelope {
                sample: x_summary.sample.clone(),
                x_min: x_statistics.min,
                x_max: x_statistics.max,
                y_min: y_statistics.min,
                y_max: y_statistics.max,
            })
        })
        .collect()
}
