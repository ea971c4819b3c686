//! One normalization pass over a measurement table.
//!
//! Every output row carries the formula, ratios, cation properties and oxygen
//! properties of a single analysis together, keyed by the source row index,
//! so a filter can never drop one view of a row while keeping another.

use super::formula::{SpinelIronSplit, normalize_formula};
use super::ratios::{MineralRatios, compute_ratios, tetrahedral_aluminium};
use super::scaler::scale_row;
use crate::domain::{Element, ElementValues, MeasurementTable, MineralClass};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CationProperties {
    pub proportions: ElementValues,
    /// Normalized cation total; the quantity the quality filter checks.
    pub sum: f64,
    pub cat_tot: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OxygenProperties {
    pub equivalents: ElementValues,
    pub sum: f64,
    pub o_sum: Option<f64>,
    pub depth: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IronSplit {
    pub fe2: f64,
    pub fe3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionRow {
    pub index: usize,
    pub sample: String,
    pub area: String,
    pub elements: ElementValues,
    pub al_iv: Option<f64>,
    pub ratios: MineralRatios,
    pub cations: CationProperties,
    pub oxygens: OxygenProperties,
    pub iron: Option<IronSplit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionResult {
    mineral: MineralClass,
    columns: Vec<Element>,
    rows: Vec<CompositionRow>,
}

impl CompositionResult {
    pub fn mineral(&self) -> MineralClass {
        self.mineral
    }

    pub fn columns(&self) -> &[Element] {
        &self.columns
    }

    pub fn rows(&self) -> &[CompositionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn indices(&self) -> BTreeSet<usize> {
        self.rows.iter().map(|row| row.index).collect()
    }

    pub fn row(&self, index: usize) -> Option<&CompositionRow> {
        self.rows.iter().find(|row| row.index == index)
    }

    pub fn without_indices(&self, removed: &BTreeSet<usize>) -> Self {
        Self {
            mineral: self.mineral,
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| !removed.contains(&row.index))
                .cloned()
                .collect(),
        }
    }
}

pub fn compose(table: &MeasurementTable, mineral: MineralClass) -> CompositionResult {
    debug!(
        mineral = %mineral,
        rows = table.len(),
        columns = table.columns().len(),
        "computing mineral formulas"
    );
    if !table.has_depth() {
        debug!("no depth column in input; oxygen properties will not carry depth");
    }

    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let scaled = scale_row(table, row);
            let formula = normalize_formula(&scaled, mineral);
            let ratios = compute_ratios(&formula, mineral);

            let al_iv = mineral.is_pyroxene().then(|| {
                tetrahedral_aluminium(
                    formula.elements.get(Element::Si).unwrap_or(f64::NAN),
                    formula.elements.value_or_zero(Element::Al),
                )
            });
            let spinel: Option<SpinelIronSplit> = formula.spinel;

            CompositionRow {
                index: row.index,
                sample: row.sample.clone(),
                area: row.area.clone(),
                elements: formula.elements,
                al_iv,
                ratios,
                cations: CationProperties {
                    proportions: formula.cation_proportions,
                    sum: formula.cation_sum,
                    cat_tot: spinel.map(|split| split.cation_total),
                },
                oxygens: OxygenProperties {
                    equivalents: formula.oxygen_equivalents,
                    sum: formula.oxygen_sum,
                    o_sum: spinel.map(|split| split.oxygen_sum),
                    depth: row.depth,
                },
                iron: spinel.map(|split| IronSplit {
                    fe2: split.fe2,
                    fe3: split.fe3,
                }),
            }
        })
        .collect();

    CompositionResult {
        mineral,
        columns: table.columns().to_vec(),
        rows,
    }
}
