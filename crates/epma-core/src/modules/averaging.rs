//! Area and sample averaging of oxide measurements.
//!
//! Groups keep the order in which their key first appears in the input, so two
//! runs over the same table always produce the same row order.

use crate::domain::{
    Element, ElementValues, EpmaError, EpmaResult, MeasurementRow, MeasurementTable,
};
use crate::numerics::{mean, range, round_to, sample_std};
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationLevel {
    Area,
    Sample,
}

/// Per-element dispersion across the areas of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleSpread {
    /// Twice the sample standard deviation; NaN for a single area.
    pub two_sd: ElementValues,
    pub delta: ElementValues,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    pub sample: String,
    /// Present at area level only.
    pub area: Option<String>,
    pub depth: Option<f64>,
    pub means: ElementValues,
    pub spread: Option<SampleSpread>,
    /// Spot analyses per area, or areas per sample.
    pub counts: usize,
}

impl AggregatedRow {
    /// `"mean ± 2SD"` with the mean to four places and the spread to three.
    pub fn presented(&self, element: Element) -> Option<String> {
        let mean = self.means.get(element)?;
        let two_sd = self
            .spread
            .as_ref()
            .and_then(|spread| spread.two_sd.get(element))?;
        Some(format!("{} ± {}", round_to(mean, 4), round_to(two_sd, 3)))
    }

    pub fn delta(&self, element: Element) -> Option<f64> {
        self.spread.as_ref()?.delta.get(element)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedTable {
    level: AggregationLevel,
    columns: Vec<Element>,
    has_depth: bool,
    rows: Vec<AggregatedRow>,
}

impl AggregatedTable {
    pub fn level(&self) -> AggregationLevel {
        self.level
    }

    pub fn columns(&self) -> &[Element] {
        &self.columns
    }

    pub fn has_depth(&self) -> bool {
        self.has_depth
    }

    pub fn rows(&self) -> &[AggregatedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Mean rows as a measurement table, so the formula can be recomputed on
    /// averages. Row indices are positions in this table.
    pub fn to_measurements(&self) -> MeasurementTable {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| MeasurementRow {
                index,
                sample: row.sample.clone(),
                area: row.area.clone().unwrap_or_default(),
                depth: row.depth,
                total: None,
                oxides: row.means,
            })
            .collect();
        MeasurementTable::with_columns(self.columns.clone(), self.has_depth, rows)
    }
}

/// Buckets item positions by key, in first-appearance order of the key.
pub(crate) fn group_in_order<K, T>(items: &[T], key: impl Fn(&T) -> K) -> Vec<(K, Vec<usize>)>
where
    K: Eq + Hash + Clone,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<usize>)> = Vec::new();
    for (position, item) in items.iter().enumerate() {
        let group_key = key(item);
        match positions.get(&group_key) {
            Some(&slot) => groups[slot].1.push(position),
            None => {
                positions.insert(group_key.clone(), groups.len());
                groups.push((group_key, vec![position]));
            }
        }
    }
    groups
}

fn column_values(members: &[usize], value: impl Fn(usize) -> f64) -> Vec<f64> {
    members.iter().map(|&member| value(member)).collect()
}

pub fn average_over_areas(table: &MeasurementTable) -> AggregatedTable {
    let rows = table.rows();
    let groups = group_in_order(rows, |row| (row.sample.clone(), row.area.clone()));

    let aggregated = groups
        .into_iter()
        .map(|((sample, area), members)| {
            let means = table
                .columns()
                .iter()
                .map(|&element| {
                    let values = column_values(&members, |member| {
                        table
                            .oxide(&rows[member], element)
                            .unwrap_or(f64::NAN)
                    });
                    (element, mean(&values))
                })
                .collect();
            let depth = table.has_depth().then(|| {
                mean(&column_values(&members, |member| {
                    rows[member].depth.unwrap_or(f64::NAN)
                }))
            });

            AggregatedRow {
                sample,
                area: Some(area),
                depth,
                means,
                spread: None,
                counts: members.len(),
            }
        })
        .collect::<Vec<_>>();

    debug!(
        spots = table.len(),
        areas = aggregated.len(),
        "averaged spot analyses over areas"
    );

    AggregatedTable {
        level: AggregationLevel::Area,
        columns: table.columns().to_vec(),
        has_depth: table.has_depth(),
        rows: aggregated,
    }
}

pub fn average_over_samples(areas: &AggregatedTable) -> EpmaResult<AggregatedTable> {
    if areas.level() != AggregationLevel::Area {
        return Err(EpmaError::internal(
            "SYS.AGGREGATION_LEVEL",
            "sample averages must be computed from an area-level table",
        ));
    }

    let rows = areas.rows();
    let groups = group_in_order(rows, |row| row.sample.clone());

    let aggregated = groups
        .into_iter()
        .map(|(sample, members)| {
            let mut means = ElementValues::default();
            let mut two_sd = ElementValues::default();
            let mut delta = ElementValues::default();
            for &element in areas.columns() {
                let values = column_values(&members, |member| {
                    rows[member].means.get(element).unwrap_or(f64::NAN)
                });
                means.set(element, mean(&values));
                two_sd.set(element, 2.0 * sample_std(&values));
                delta.set(element, range(&values));
            }
            let depth = areas.has_depth().then(|| {
                mean(&column_values(&members, |member| {
                    rows[member].depth.unwrap_or(f64::NAN)
                }))
            });

            AggregatedRow {
                sample,
                area: None,
                depth,
                means,
                spread: Some(SampleSpread { two_sd, delta }),
                counts: members.len(),
            }
        })
        .collect::<Vec<_>>();

    debug!(
        areas = areas.len(),
        samples = aggregated.len(),
        "averaged areas over samples"
    );

    Ok(AggregatedTable {
        level: AggregationLevel::Sample,
        columns: areas.columns().to_vec(),
        has_depth: areas.has_depth(),
        rows: aggregated,
    })
}
