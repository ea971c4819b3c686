//! Flat report tables for the spot, area and sample stages.
//!
//! Oxide columns are labelled by oxide (`SiO2`, `MgO`, ...), formula columns by
//! element symbol. `Number of datapoints averaged` is always the last column.

use super::averaging::{AggregatedRow, AggregatedTable, AggregationLevel};
use super::composition::{CompositionResult, CompositionRow};
use super::ratios::ratio_names;
use super::serialization::{format_cell, format_optional_cell};
use crate::domain::{Element, EpmaError, EpmaResult, MineralClass};
use crate::numerics::stable_sum;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const COUNTS_HEADER: &str = "Number of datapoints averaged";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStage {
    Spots,
    Areas,
    Samples,
}

impl ReportStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spots => "spots",
            Self::Areas => "areas",
            Self::Samples => "samples",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    pub sheet: String,
    pub stage: ReportStage,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    /// `olivine_data_samples.csv` and the like.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.csv",
            self.sheet.to_ascii_lowercase().replace(' ', "_"),
            self.stage.as_str()
        )
    }

    pub fn column(&self, header: &str) -> Option<Vec<&str>> {
        let position = self.headers.iter().position(|candidate| candidate == header)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(position).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.headers)?;
        for row in &self.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the table into `directory` under [`Self::file_name`].
    pub fn write_csv(&self, directory: &Path) -> EpmaResult<PathBuf> {
        let path = directory.join(self.file_name());
        let file = File::create(&path).map_err(|source| {
            EpmaError::io_system(
                "IO.REPORT_WRITE",
                format!("failed to create '{}': {source}", path.display()),
            )
        })?;
        self.write_csv_to(file).map_err(|source| {
            EpmaError::io_system(
                "IO.REPORT_WRITE",
                format!("failed to write '{}': {source}", path.display()),
            )
        })?;
        Ok(path)
    }
}

fn formula_headers(mineral: MineralClass, columns: &[Element]) -> Vec<String> {
    let mut headers: Vec<String> = columns
        .iter()
        .map(|element| element.symbol().to_string())
        .collect();
    if mineral.is_pyroxene() {
        headers.push("Al_IV".to_string());
    }
    headers
}

fn formula_cells(
    mineral: MineralClass,
    columns: &[Element],
    row: Option<&CompositionRow>,
) -> Vec<String> {
    let mut cells: Vec<String> = columns
        .iter()
        .map(|&element| format_optional_cell(row.and_then(|row| row.elements.get(element))))
        .collect();
    if mineral.is_pyroxene() {
        cells.push(format_optional_cell(row.and_then(|row| row.al_iv)));
    }
    cells
}

fn oxide_total(row: &AggregatedRow, columns: &[Element]) -> f64 {
    let means: Vec<f64> = columns
        .iter()
        .map(|&element| row.means.get(element).unwrap_or(f64::NAN))
        .collect();
    stable_sum(&means)
}

fn primary_ratio_name(mineral: MineralClass) -> &'static str {
    match mineral {
        MineralClass::Olivine => "Fo",
        MineralClass::Orthopyroxene | MineralClass::Clinopyroxene => "Mg#",
        MineralClass::Spinel => "CrN",
    }
}

/// Area or sample report. `composition` is the formula recomputed on the
/// averaged rows, aligned by position.
pub fn aggregated_report(
    averages: &AggregatedTable,
    composition: &CompositionResult,
) -> ReportTable {
    let mineral = composition.mineral();
    let columns = averages.columns();
    let sample_level = averages.level() == AggregationLevel::Sample;
    let primary = primary_ratio_name(mineral);

    let mut headers = vec!["Sample".to_string()];
    if !sample_level {
        headers.push("Area".to_string());
    }
    if averages.has_depth() {
        headers.push("Depth".to_string());
    }
    headers.extend(columns.iter().map(|element| element.oxide_label().to_string()));
    headers.push("Oxide total".to_string());
    headers.extend(formula_headers(mineral, columns));
    headers.push(primary.to_string());
    headers.push("Cation sum".to_string());
    if sample_level {
        headers.extend(
            columns
                .iter()
                .map(|element| format!("delta_{}", element.oxide_label())),
        );
    }
    headers.push(COUNTS_HEADER.to_string());

    let rows = averages
        .rows()
        .iter()
        .enumerate()
        .map(|(position, row)| {
            let formula = composition.row(position);
            let mut cells = vec![row.sample.clone()];
            if let Some(area) = row.area.as_ref().filter(|_| !sample_level) {
                cells.push(area.clone());
            }
            if averages.has_depth() {
                cells.push(format_optional_cell(row.depth));
            }
            cells.extend(columns.iter().map(|&element| {
                if sample_level {
                    row.presented(element).unwrap_or_default()
                } else {
                    format_optional_cell(row.means.get(element))
                }
            }));
            cells.push(format_cell(oxide_total(row, columns)));
            cells.extend(formula_cells(mineral, columns, formula));
            cells.push(format_optional_cell(
                formula.and_then(|formula| formula.ratios.get(primary)),
            ));
            cells.push(format_optional_cell(formula.map(|formula| formula.cations.sum)));
            if sample_level {
                cells.extend(
                    columns
                        .iter()
                        .map(|&element| format_optional_cell(row.delta(element))),
                );
            }
            cells.push(row.counts.to_string());
            cells
        })
        .collect();

    ReportTable {
        sheet: mineral.sheet_name().to_string(),
        stage: if sample_level {
            ReportStage::Samples
        } else {
            ReportStage::Areas
        },
        headers,
        rows,
    }
}

/// One row per spot analysis with every ratio and the cation and oxygen sums.
pub fn composition_report(composition: &CompositionResult) -> ReportTable {
    let mineral = composition.mineral();
    let columns = composition.columns();
    let spinel = mineral == MineralClass::Spinel;
    let has_depth = composition
        .rows()
        .iter()
        .any(|row| row.oxygens.depth.is_some());

    let mut headers = vec!["Index".to_string(), "Sample".to_string(), "Area".to_string()];
    if has_depth {
        headers.push("Depth".to_string());
    }
    headers.extend(formula_headers(mineral, columns));
    headers.extend(
        ratio_names(mineral.ratio_family())
            .iter()
            .map(|name| name.to_string()),
    );
    headers.push("Cation sum".to_string());
    headers.push("Oxygen sum".to_string());
    if spinel {
        headers.extend(["Fe2", "Fe3", "Cat_tot", "O_sum"].map(str::to_string));
    }

    let rows = composition
        .rows()
        .iter()
        .map(|row| {
            let mut cells = vec![row.index.to_string(), row.sample.clone(), row.area.clone()];
            if has_depth {
                cells.push(format_optional_cell(row.oxygens.depth));
            }
            cells.extend(formula_cells(mineral, columns, Some(row)));
            cells.extend(
                row.ratios
                    .entries()
                    .into_iter()
                    .map(|(_, value)| format_cell(value)),
            );
            cells.push(format_cell(row.cations.sum));
            cells.push(format_cell(row.oxygens.sum));
            if spinel {
                cells.push(format_optional_cell(row.iron.map(|iron| iron.fe2)));
                cells.push(format_optional_cell(row.iron.map(|iron| iron.fe3)));
                cells.push(format_optional_cell(row.cations.cat_tot));
                cells.push(format_optional_cell(row.oxygens.o_sum));
            }
            cells
        })
        .collect();

    ReportTable {
        sheet: mineral.sheet_name().to_string(),
        stage: ReportStage::Spots,
        headers,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::{COUNTS_HEADER, aggregated_report, composition_report};
    use crate::domain::{Element, MeasurementRow, MeasurementTable, MineralClass};
    use crate::modules::averaging::{average_over_areas, average_over_samples};
    use crate::modules::composition::compose;
    use tempfile::TempDir;

    fn spots() -> MeasurementTable {
        MeasurementTable::new(vec![
            MeasurementRow::new(0, "A", "1")
                .with_oxide(Element::Si, 40.0)
                .with_oxide(Element::Mg, 50.0)
                .with_oxide(Element::Fe, 9.0),
            MeasurementRow::new(1, "A", "1")
                .with_oxide(Element::Si, 42.0)
                .with_oxide(Element::Mg, 48.0)
                .with_oxide(Element::Fe, 9.0),
            MeasurementRow::new(2, "A", "2")
                .with_oxide(Element::Si, 50.0)
                .with_oxide(Element::Mg, 40.0)
                .with_oxide(Element::Fe, 10.0),
        ])
    }

    #[test]
    fn area_report_renames_oxides_and_moves_counts_last() {
        let areas = average_over_areas(&spots());
        let composition = compose(&areas.to_measurements(), MineralClass::Olivine);
        let report = aggregated_report(&areas, &composition);

        assert_eq!(
            report.headers,
            vec![
                "Sample", "Area", "SiO2", "MgO", "FeO", "Oxide total", "Si", "Mg", "Fe", "Fo",
                "Cation sum", COUNTS_HEADER,
            ]
        );
        assert_eq!(report.column("SiO2").unwrap(), vec!["41", "50"]);
        assert_eq!(report.column("Oxide total").unwrap(), vec!["99", "100"]);
        assert_eq!(report.column(COUNTS_HEADER).unwrap(), vec!["2", "1"]);
        assert_eq!(report.file_name(), "olivine_data_areas.csv");
    }

    #[test]
    fn sample_report_presents_mean_and_spread() {
        let areas = average_over_areas(&spots());
        let samples = average_over_samples(&areas).unwrap();
        let composition = compose(&samples.to_measurements(), MineralClass::Orthopyroxene);
        let report = aggregated_report(&samples, &composition);

        assert!(!report.headers.contains(&"Area".to_string()));
        assert!(report.headers.contains(&"Al_IV".to_string()));
        assert!(report.headers.contains(&"Mg#".to_string()));
        assert_eq!(report.headers.last().map(String::as_str), Some(COUNTS_HEADER));
        assert_eq!(report.column("SiO2").unwrap(), vec!["45.5 ± 12.728"]);
        assert_eq!(report.column("delta_SiO2").unwrap(), vec!["9"]);
        assert_eq!(report.file_name(), "opx_data_samples.csv");
    }

    #[test]
    fn spinel_spot_report_lists_iron_split() {
        let table = MeasurementTable::new(vec![
            MeasurementRow::new(4, "S", "a")
                .with_oxide(Element::Al, 30.0)
                .with_oxide(Element::Cr, 35.0)
                .with_oxide(Element::Mg, 15.0)
                .with_oxide(Element::Fe, 18.0),
        ]);
        let report = composition_report(&compose(&table, MineralClass::Spinel));

        assert!(report.headers.ends_with(&[
            "Fe2".to_string(),
            "Fe3".to_string(),
            "Cat_tot".to_string(),
            "O_sum".to_string()
        ]));
        assert_eq!(report.column("Index").unwrap(), vec!["4"]);
        assert!(report.headers.contains(&"CrN".to_string()));
    }

    #[test]
    fn csv_output_has_header_and_rows() {
        let temp = TempDir::new().expect("tempdir should be created");
        let areas = average_over_areas(&spots());
        let composition = compose(&areas.to_measurements(), MineralClass::Olivine);
        let path = aggregated_report(&areas, &composition)
            .write_csv(temp.path())
            .expect("report should be written");

        let content = std::fs::read_to_string(path).expect("report should be readable");
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("Sample,Area,SiO2"));
        assert_eq!(lines.count(), 2);
    }
}
