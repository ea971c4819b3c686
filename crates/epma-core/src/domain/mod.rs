pub mod errors;

pub use errors::{EpmaError, EpmaErrorCategory, EpmaResult};

use crate::numerics::stable_sum;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub const ELEMENT_COUNT: usize = 11;

/// Measured cations, in the column order microprobe exports use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Element {
    Si,
    Ti,
    Al,
    Cr,
    Mn,
    Mg,
    Ni,
    Fe,
    Ca,
    Na,
    K,
}

impl Element {
    pub const ALL: [Element; ELEMENT_COUNT] = [
        Self::Si,
        Self::Ti,
        Self::Al,
        Self::Cr,
        Self::Mn,
        Self::Mg,
        Self::Ni,
        Self::Fe,
        Self::Ca,
        Self::Na,
        Self::K,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Si => "Si",
            Self::Ti => "Ti",
            Self::Al => "Al",
            Self::Cr => "Cr",
            Self::Mn => "Mn",
            Self::Mg => "Mg",
            Self::Ni => "Ni",
            Self::Fe => "Fe",
            Self::Ca => "Ca",
            Self::Na => "Na",
            Self::K => "K",
        }
    }

    /// Column label of the element once reported as its oxide.
    pub const fn oxide_label(self) -> &'static str {
        match self {
            Self::Si => "SiO2",
            Self::Ti => "TiO2",
            Self::Al => "Al2O3",
            Self::Cr => "Cr2O3",
            Self::Mn => "MnO",
            Self::Mg => "MgO",
            Self::Ni => "NiO",
            Self::Fe => "FeO",
            Self::Ca => "CaO",
            Self::Na => "Na2O",
            Self::K => "K2O",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let normalized = symbol.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|element| element.symbol() == normalized)
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One optional value per element, indexed by `Element`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElementValues([Option<f64>; ELEMENT_COUNT]);

impl ElementValues {
    pub fn get(&self, element: Element) -> Option<f64> {
        self.0[element.index()]
    }

    /// Absent elements contribute nothing to a sum or product term.
    pub fn value_or_zero(&self, element: Element) -> f64 {
        self.get(element).unwrap_or(0.0)
    }

    pub fn set(&mut self, element: Element, value: f64) {
        self.0[element.index()] = Some(value);
    }

    pub fn with(mut self, element: Element, value: f64) -> Self {
        self.set(element, value);
        self
    }

    pub fn contains(&self, element: Element) -> bool {
        self.get(element).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Element, f64)> + '_ {
        Element::ALL
            .iter()
            .filter_map(|element| self.get(*element).map(|value| (*element, value)))
    }

    pub fn map(&self, mut transform: impl FnMut(Element, f64) -> f64) -> Self {
        let mut mapped = Self::default();
        for (element, value) in self.iter() {
            mapped.set(element, transform(element, value));
        }
        mapped
    }

    pub fn sum(&self) -> f64 {
        let values: Vec<f64> = self.iter().map(|(_, value)| value).collect();
        stable_sum(&values)
    }
}

impl FromIterator<(Element, f64)> for ElementValues {
    fn from_iter<T: IntoIterator<Item = (Element, f64)>>(iter: T) -> Self {
        let mut values = Self::default();
        for (element, value) in iter {
            values.set(element, value);
        }
        values
    }
}

impl Serialize for ElementValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (element, value) in self.iter() {
            map.serialize_entry(element.symbol(), &value)?;
        }
        map.end()
    }
}

/// Which ratio set a mineral class reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RatioFamily {
    Olivine,
    Pyroxene,
    Spinel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MineralClass {
    Olivine,
    Orthopyroxene,
    Clinopyroxene,
    Spinel,
}

impl MineralClass {
    pub const ALL: [MineralClass; 4] = [
        Self::Olivine,
        Self::Orthopyroxene,
        Self::Clinopyroxene,
        Self::Spinel,
    ];

    pub fn parse(name: &str) -> EpmaResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "olivine" | "ol" => Ok(Self::Olivine),
            "orthopyroxene" | "opx" => Ok(Self::Orthopyroxene),
            "clinopyroxene" | "cpx" => Ok(Self::Clinopyroxene),
            "spinel" | "sp" => Ok(Self::Spinel),
            _ => Err(EpmaError::unsupported_mineral_type(name)),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Olivine => "olivine",
            Self::Orthopyroxene => "orthopyroxene",
            Self::Clinopyroxene => "clinopyroxene",
            Self::Spinel => "spinel",
        }
    }

    pub const fn ratio_family(self) -> RatioFamily {
        match self {
            Self::Olivine => RatioFamily::Olivine,
            Self::Orthopyroxene | Self::Clinopyroxene => RatioFamily::Pyroxene,
            Self::Spinel => RatioFamily::Spinel,
        }
    }

    pub const fn is_pyroxene(self) -> bool {
        matches!(self.ratio_family(), RatioFamily::Pyroxene)
    }

    /// Oxygen anions per formula unit.
    pub const fn ideal_oxygen_count(self) -> f64 {
        match self.ratio_family() {
            RatioFamily::Olivine | RatioFamily::Spinel => 4.0,
            RatioFamily::Pyroxene => 6.0,
        }
    }

    /// Cation total the quality filter centres its tolerance window on.
    pub const fn ideal_cation_sum(self) -> f64 {
        match self.ratio_family() {
            RatioFamily::Olivine => 3.0,
            RatioFamily::Pyroxene | RatioFamily::Spinel => 4.0,
        }
    }

    pub const fn sheet_name(self) -> &'static str {
        match self {
            Self::Olivine => "Olivine data",
            Self::Orthopyroxene => "Opx data",
            Self::Clinopyroxene => "Cpx data",
            Self::Spinel => "Spinel data",
        }
    }
}

impl FromStr for MineralClass {
    type Err = EpmaError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::parse(name)
    }
}

impl Display for MineralClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// One spot analysis. `index` is the row identity carried through every stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRow {
    pub index: usize,
    pub sample: String,
    pub area: String,
    pub depth: Option<f64>,
    pub total: Option<f64>,
    pub oxides: ElementValues,
}

impl MeasurementRow {
    pub fn new(index: usize, sample: impl Into<String>, area: impl Into<String>) -> Self {
        Self {
            index,
            sample: sample.into(),
            area: area.into(),
            depth: None,
            total: None,
            oxides: ElementValues::default(),
        }
    }

    pub fn with_oxide(mut self, element: Element, weight_percent: f64) -> Self {
        self.oxides.set(element, weight_percent);
        self
    }

    pub fn with_total(mut self, total: f64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_depth(mut self, depth: f64) -> Self {
        self.depth = Some(depth);
        self
    }
}

/// Spot analyses sharing one set of element columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MeasurementTable {
    columns: Vec<Element>,
    has_depth: bool,
    rows: Vec<MeasurementRow>,
}

impl MeasurementTable {
    /// Columns are every element measured in at least one row; a column
    /// missing from an individual row reads as NaN.
    pub fn new(rows: Vec<MeasurementRow>) -> Self {
        let columns = Element::ALL
            .iter()
            .copied()
            .filter(|element| rows.iter().any(|row| row.oxides.contains(*element)))
            .collect();
        let has_depth = rows.iter().any(|row| row.depth.is_some());
        Self::with_columns(columns, has_depth, rows)
    }

    pub fn with_columns(
        mut columns: Vec<Element>,
        has_depth: bool,
        rows: Vec<MeasurementRow>,
    ) -> Self {
        columns.sort();
        columns.dedup();
        Self {
            columns,
            has_depth,
            rows,
        }
    }

    pub fn columns(&self) -> &[Element] {
        &self.columns
    }

    pub fn has_column(&self, element: Element) -> bool {
        self.columns.contains(&element)
    }

    pub fn has_depth(&self) -> bool {
        self.has_depth
    }

    pub fn rows(&self) -> &[MeasurementRow] {
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

    /// Measured value of `element` in `row`, NaN when this row lacks a present column.
    pub fn oxide(&self, row: &MeasurementRow, element: Element) -> Option<f64> {
        self.has_column(element)
            .then(|| row.oxides.get(element).unwrap_or(f64::NAN))
    }

    /// A new table without the rows whose index is in `removed`.
    pub fn without_indices(&self, removed: &BTreeSet<usize>) -> Self {
        Self {
            columns: self.columns.clone(),
            has_depth: self.has_depth,
            rows: self
                .rows
                .iter()
                .filter(|row| !removed.contains(&row.index))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Element, ElementValues, MeasurementRow, MeasurementTable, MineralClass};
    use crate::domain::errors::UNSUPPORTED_MINERAL_TYPE;
    use std::collections::BTreeSet;

    #[test]
    fn mineral_class_parsing_accepts_names_and_abbreviations() {
        assert_eq!(MineralClass::parse("Olivine").unwrap(), MineralClass::Olivine);
        assert_eq!(MineralClass::parse(" opx ").unwrap(), MineralClass::Orthopyroxene);
        assert_eq!(
            "clinopyroxene".parse::<MineralClass>().unwrap(),
            MineralClass::Clinopyroxene
        );
        assert_eq!(MineralClass::parse("SPINEL").unwrap(), MineralClass::Spinel);

        let error = MineralClass::parse("garnet").expect_err("garnet is unsupported");
        assert_eq!(error.placeholder(), UNSUPPORTED_MINERAL_TYPE);
    }

    #[test]
    fn ideal_counts_follow_mineral_class() {
        assert_eq!(MineralClass::Olivine.ideal_oxygen_count(), 4.0);
        assert_eq!(MineralClass::Spinel.ideal_oxygen_count(), 4.0);
        assert_eq!(MineralClass::Orthopyroxene.ideal_oxygen_count(), 6.0);
        assert_eq!(MineralClass::Olivine.ideal_cation_sum(), 3.0);
        assert_eq!(MineralClass::Clinopyroxene.ideal_cation_sum(), 4.0);
        assert_eq!(MineralClass::Spinel.ideal_cation_sum(), 4.0);
        assert!(MineralClass::Clinopyroxene.is_pyroxene());
        assert!(!MineralClass::Spinel.is_pyroxene());
    }

    #[test]
    fn element_symbols_and_oxides_round_trip() {
        for element in Element::ALL {
            assert_eq!(Element::from_symbol(element.symbol()), Some(element));
        }
        assert_eq!(Element::from_symbol(" Mg "), Some(Element::Mg));
        assert_eq!(Element::from_symbol("Xx"), None);
        assert_eq!(Element::Mg.oxide_label(), "MgO");
        assert_eq!(Element::Si.oxide_label(), "SiO2");
    }

    #[test]
    fn element_values_skip_absent_entries() {
        let values = ElementValues::default()
            .with(Element::Si, 1.0)
            .with(Element::Mg, 2.0);
        assert_eq!(values.iter().count(), 2);
        assert_eq!(values.sum(), 3.0);
        assert_eq!(values.value_or_zero(Element::K), 0.0);
        assert_eq!(values.map(|_, value| value * 2.0).get(Element::Mg), Some(4.0));
    }

    #[test]
    fn table_columns_come_from_measured_elements() {
        let table = MeasurementTable::new(vec![
            MeasurementRow::new(0, "A", "1").with_oxide(Element::Mg, 40.0),
            MeasurementRow::new(1, "A", "1")
                .with_oxide(Element::Si, 40.0)
                .with_depth(12.5),
        ]);

        assert_eq!(table.columns(), &[Element::Si, Element::Mg]);
        assert!(table.has_depth());
        assert!(!table.has_column(Element::K));
        assert!(table.oxide(&table.rows()[0], Element::Si).unwrap().is_nan());
        assert_eq!(table.oxide(&table.rows()[0], Element::K), None);

        let removed = BTreeSet::from([0]);
        let kept = table.without_indices(&removed);
        assert_eq!(kept.indices(), BTreeSet::from([1]));
        assert_eq!(kept.columns(), table.columns());
    }
}
