use crate::common::constants::scale_factors;
use crate::domain::{ElementValues, MeasurementRow, MeasurementTable};
use serde::Serialize;

/// Molar quantities derived from one row's oxide weight percentages.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScaledElements {
    pub proportions: ElementValues,
    pub cation_proportions: ElementValues,
    pub oxygen_equivalents: ElementValues,
}

/// Elements the table does not carry are skipped, not treated as zero.
pub fn scale_row(table: &MeasurementTable, row: &MeasurementRow) -> ScaledElements {
    let mut scaled = ScaledElements::default();
    for &element in table.columns() {
        let Some(weight_percent) = table.oxide(row, element) else {
            continue;
        };
        let factors = scale_factors(element);
        let proportion = weight_percent / factors.formula_weight;

        scaled.proportions.set(element, proportion);
        scaled
            .cation_proportions
            .set(element, proportion * factors.cations);
        scaled
            .oxygen_equivalents
            .set(element, proportion * factors.oxygens);
    }
    scaled
}

pub fn scale_measurements(table: &MeasurementTable) -> Vec<ScaledElements> {
    table
        .rows()
        .iter()
        .map(|row| scale_row(table, row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{scale_measurements, scale_row};
    use crate::domain::{Element, MeasurementRow, MeasurementTable};

    #[test]
    fn proportions_follow_scale_factors() {
        let table = MeasurementTable::new(vec![
            MeasurementRow::new(0, "A", "1")
                .with_oxide(Element::Si, 60.08)
                .with_oxide(Element::Al, 101.96)
                .with_oxide(Element::Na, 61.98),
        ]);
        let scaled = scale_row(&table, &table.rows()[0]);

        assert_eq!(scaled.proportions.get(Element::Si), Some(1.0));
        assert_eq!(scaled.cation_proportions.get(Element::Si), Some(1.0));
        assert_eq!(scaled.oxygen_equivalents.get(Element::Si), Some(2.0));

        assert_eq!(scaled.cation_proportions.get(Element::Al), Some(2.0));
        assert_eq!(scaled.oxygen_equivalents.get(Element::Al), Some(3.0));

        assert_eq!(scaled.cation_proportions.get(Element::Na), Some(2.0));
        assert_eq!(scaled.oxygen_equivalents.get(Element::Na), Some(1.0));
    }

    #[test]
    fn absent_elements_are_skipped_silently() {
        let table = MeasurementTable::new(vec![
            MeasurementRow::new(0, "A", "1")
                .with_oxide(Element::Mg, 40.305)
                .with_oxide(Element::Fe, 71.85),
        ]);
        let scaled = scale_measurements(&table);

        assert_eq!(scaled.len(), 1);
        assert!(!scaled[0].proportions.contains(Element::K));
        assert!(!scaled[0].oxygen_equivalents.contains(Element::Si));
        assert_eq!(scaled[0].oxygen_equivalents.sum(), 2.0);
    }
}
