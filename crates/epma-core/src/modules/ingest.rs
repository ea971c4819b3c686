//! Delimited-text ingestion of microprobe exports.
//!
//! Structural columns are located by name, element columns by their symbol
//! header (`Si`, `Mg`, ...). Rows with a blank or unparseable value in any
//! recognized column are dropped, then rows whose analytical total falls
//! outside the open `(total_min, total_max)` interval.

use crate::common::constants::{DEFAULT_TOTAL_MAX, DEFAULT_TOTAL_MIN};
use crate::domain::{Element, EpmaError, MeasurementRow, MeasurementTable};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

impl From<IngestError> for EpmaError {
    fn from(error: IngestError) -> Self {
        match error {
            IngestError::MissingColumn(column) => EpmaError::missing_column(&column),
            other => EpmaError::io_system("IO.INPUT_TABLE", other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ColumnNames {
    pub sample: String,
    pub area: String,
    pub total: String,
    pub depth: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            sample: "Project Path (2)".to_string(),
            area: "Project Path (3)".to_string(),
            total: "Total".to_string(),
            depth: "Depth".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TotalFilter {
    pub total_min: f64,
    pub total_max: f64,
}

impl Default for TotalFilter {
    fn default() -> Self {
        Self {
            total_min: DEFAULT_TOTAL_MIN,
            total_max: DEFAULT_TOTAL_MAX,
        }
    }
}

impl TotalFilter {
    pub fn accepts(&self, total: f64) -> bool {
        total > self.total_min && total < self.total_max
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestOptions {
    pub columns: ColumnNames,
    pub filter: TotalFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub table: MeasurementTable,
    pub records_read: usize,
    pub dropped_incomplete: usize,
    pub dropped_total: usize,
}

struct ColumnLayout {
    sample: usize,
    area: usize,
    total: usize,
    depth: Option<usize>,
    elements: Vec<(Element, usize)>,
}

impl ColumnLayout {
    fn locate(headers: &[String], names: &ColumnNames) -> Result<Self, IngestError> {
        let position = |name: &str| headers.iter().position(|header| header == name.trim());
        let required = |name: &str| {
            position(name).ok_or_else(|| IngestError::MissingColumn(name.to_string()))
        };

        let mut elements: Vec<(Element, usize)> = headers
            .iter()
            .enumerate()
            .filter_map(|(index, header)| {
                Element::from_symbol(header).map(|element| (element, index))
            })
            .collect();
        elements.sort_by_key(|(element, _)| *element);
        elements.dedup_by_key(|(element, _)| *element);

        Ok(Self {
            sample: required(names.sample.as_str())?,
            area: required(names.area.as_str())?,
            total: required(names.total.as_str())?,
            depth: position(names.depth.as_str()),
            elements,
        })
    }
}

fn text_cell<'r>(record: &'r csv::StringRecord, column: usize) -> Option<&'r str> {
    record
        .get(column)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn number_cell(record: &csv::StringRecord, column: usize) -> Option<f64> {
    text_cell(record, column)?.parse::<f64>().ok()
}

fn parse_record(
    index: usize,
    record: &csv::StringRecord,
    layout: &ColumnLayout,
) -> Option<MeasurementRow> {
    let mut row = MeasurementRow::new(
        index,
        text_cell(record, layout.sample)?,
        text_cell(record, layout.area)?,
    )
    .with_total(number_cell(record, layout.total)?);
    if let Some(column) = layout.depth {
        row = row.with_depth(number_cell(record, column)?);
    }
    for &(element, column) in &layout.elements {
        row = row.with_oxide(element, number_cell(record, column)?);
    }
    Some(row)
}

pub fn read_measurements<R: Read>(
    reader: R,
    delimiter: u8,
    options: &IngestOptions,
) -> Result<IngestReport, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();
    let layout = ColumnLayout::locate(&headers, &options.columns)?;
    debug!(
        elements = layout.elements.len(),
        depth = layout.depth.is_some(),
        "located input columns"
    );

    let mut rows = Vec::new();
    let mut records_read = 0;
    let mut dropped_incomplete = 0;
    let mut dropped_total = 0;

    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        records_read += 1;
        let Some(row) = parse_record(index, &record, &layout) else {
            dropped_incomplete += 1;
            continue;
        };
        if !row.total.is_some_and(|total| options.filter.accepts(total)) {
            dropped_total += 1;
            continue;
        }
        rows.push(row);
    }

    if dropped_incomplete > 0 {
        warn!(dropped_incomplete, "dropped rows with blank or non-numeric cells");
    }
    if dropped_total > 0 {
        warn!(
            dropped_total,
            total_min = options.filter.total_min,
            total_max = options.filter.total_max,
            "dropped rows with analytical total outside the accepted window"
        );
    }
    if layout.depth.is_none() {
        debug!(column = %options.columns.depth, "input has no depth column");
    }

    let columns = layout.elements.iter().map(|(element, _)| *element).collect();
    Ok(IngestReport {
        table: MeasurementTable::with_columns(columns, layout.depth.is_some(), rows),
        records_read,
        dropped_incomplete,
        dropped_total,
    })
}

/// Tab-delimited for `.tsv` and `.txt`, comma-delimited otherwise.
pub fn delimiter_for(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("tsv") | Some("txt") => b'\t',
        _ => b',',
    }
}

pub fn read_measurements_path(
    path: &Path,
    options: &IngestOptions,
) -> Result<IngestReport, IngestError> {
    let file = File::open(path)?;
    read_measurements(BufReader::new(file), delimiter_for(path), options)
}
