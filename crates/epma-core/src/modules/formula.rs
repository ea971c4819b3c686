//! Normalization of cation proportions onto a fixed number of oxygens.
//!
//! Spinel carries mixed-valence iron, so after the ordinary normalization its
//! total iron is apportioned between Fe2+ and Fe3+ by charge balance in one
//! analytical pass:
//!
//! 1. trial oxygen sum on a three-cation basis with all iron as Fe2+
//! 2. oxygen deficit against four oxygens, giving `Fe3 = 2 * deficit`
//! 3. `Fe2` as the three-cation iron less `Fe3`
//! 4. a cation factor rescaling Ti, Al, Cr, Mn, Mg and Fe
//! 5. final cation total and oxygen sum from the corrected split

use super::scaler::ScaledElements;
use crate::domain::{Element, ElementValues, MineralClass, RatioFamily};
use serde::Serialize;

const SPINEL_CATIONS: f64 = 3.0;
const SPINEL_OXYGENS: f64 = 4.0;
const SPINEL_RESCALED: [Element; 6] = [
    Element::Ti,
    Element::Al,
    Element::Cr,
    Element::Mn,
    Element::Mg,
    Element::Fe,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpinelIronSplit {
    pub fe2: f64,
    pub fe3: f64,
    /// Cation total after the correction, counting Fe2 and Fe3 alongside Fe.
    pub cation_total: f64,
    pub oxygen_sum: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedFormula {
    pub elements: ElementValues,
    pub cation_proportions: ElementValues,
    /// Sum of the normalized formula before any spinel correction.
    pub cation_sum: f64,
    pub oxygen_equivalents: ElementValues,
    pub oxygen_sum: f64,
    pub normalization_factor: f64,
    pub spinel: Option<SpinelIronSplit>,
}

pub fn normalize_formula(scaled: &ScaledElements, mineral: MineralClass) -> NormalizedFormula {
    let oxygen_sum = scaled.oxygen_equivalents.sum();
    let normalization_factor = mineral.ideal_oxygen_count() / oxygen_sum;

    let mut elements = scaled
        .cation_proportions
        .map(|_, proportion| normalization_factor * proportion);
    let cation_sum = elements.sum();

    let spinel = (mineral.ratio_family() == RatioFamily::Spinel)
        .then(|| apply_spinel_correction(&mut elements, cation_sum));

    NormalizedFormula {
        elements,
        cation_proportions: scaled.cation_proportions,
        cation_sum,
        oxygen_equivalents: scaled.oxygen_equivalents,
        oxygen_sum,
        normalization_factor,
        spinel,
    }
}

fn apply_spinel_correction(elements: &mut ElementValues, cation_sum: f64) -> SpinelIronSplit {
    let ti = elements.value_or_zero(Element::Ti);
    let al = elements.value_or_zero(Element::Al);
    let cr = elements.value_or_zero(Element::Cr);
    let mn = elements.value_or_zero(Element::Mn);
    let mg = elements.value_or_zero(Element::Mg);
    let fe = elements.value_or_zero(Element::Fe);

    let cation_basis = SPINEL_CATIONS / cation_sum;
    let trial_oxygen_sum = cation_basis * (2.0 * ti + 1.5 * al + 1.5 * cr + fe + mn + mg);
    let oxygen_deficit = SPINEL_OXYGENS - trial_oxygen_sum;
    let fe3 = 2.0 * oxygen_deficit;
    let fe2 = fe * cation_basis - fe3;
    let cation_factor = (SPINEL_CATIONS - fe2 - fe3) / (ti + al + cr + mn + mg);

    for element in SPINEL_RESCALED {
        if let Some(value) = elements.get(element) {
            elements.set(element, value * cation_factor);
        }
    }

    let ti = elements.value_or_zero(Element::Ti);
    let al = elements.value_or_zero(Element::Al);
    let cr = elements.value_or_zero(Element::Cr);
    let mn = elements.value_or_zero(Element::Mn);
    let mg = elements.value_or_zero(Element::Mg);
    let fe = elements.value_or_zero(Element::Fe);

    SpinelIronSplit {
        fe2,
        fe3,
        cation_total: ti + al + cr + mn + mg + fe + fe2 + fe3,
        oxygen_sum: 2.0 * ti + 1.5 * al + 1.5 * cr + mn + mg + fe2 + 1.5 * fe3,
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_formula;
    use crate::domain::{Element, MeasurementRow, MeasurementTable, MineralClass};
    use crate::modules::scaler::scale_row;

    fn scaled_single_row(row: MeasurementRow) -> super::ScaledElements {
        let table = MeasurementTable::new(vec![row]);
        scale_row(&table, &table.rows()[0])
    }

    #[test]
    fn forsterite_normalizes_to_three_cations() {
        // Mg2SiO4: two MgO per SiO2.
        let scaled = scaled_single_row(
            MeasurementRow::new(0, "A", "1")
                .with_oxide(Element::Si, 60.08)
                .with_oxide(Element::Mg, 2.0 * 40.305),
        );
        let formula = normalize_formula(&scaled, MineralClass::Olivine);

        assert!((formula.oxygen_sum - 4.0).abs() <= 1.0e-12);
        assert!((formula.cation_sum - 3.0).abs() <= 1.0e-6);
        assert!((formula.elements.get(Element::Si).unwrap() - 1.0).abs() <= 1.0e-6);
        assert!((formula.elements.get(Element::Mg).unwrap() - 2.0).abs() <= 1.0e-6);
        assert!(formula.spinel.is_none());
    }

    #[test]
    fn enstatite_normalizes_to_four_cations_on_six_oxygens() {
        // Mg2Si2O6
        let scaled = scaled_single_row(
            MeasurementRow::new(0, "A", "1")
                .with_oxide(Element::Si, 2.0 * 60.08)
                .with_oxide(Element::Mg, 2.0 * 40.305),
        );
        let formula = normalize_formula(&scaled, MineralClass::Orthopyroxene);

        assert!((formula.cation_sum - 4.0).abs() <= 1.0e-6);
        assert!((formula.normalization_factor - 1.0).abs() <= 1.0e-12);
    }

    #[test]
    fn stoichiometric_spinel_has_no_ferric_iron() {
        // MgAl2O4 with a little FeO: trial oxygens equal four, so Fe3 vanishes.
        let scaled = scaled_single_row(
            MeasurementRow::new(0, "A", "1")
                .with_oxide(Element::Al, 101.96)
                .with_oxide(Element::Mg, 0.9 * 40.305)
                .with_oxide(Element::Fe, 0.1 * 71.85),
        );
        let formula = normalize_formula(&scaled, MineralClass::Spinel);
        let split = formula.spinel.expect("spinel split should be computed");

        assert!((formula.cation_sum - 3.0).abs() <= 1.0e-9);
        assert!(split.fe3.abs() <= 1.0e-9);
        assert!((split.fe2 - 0.1).abs() <= 1.0e-9);
        assert!((split.oxygen_sum - 4.0).abs() <= 1.0e-9);
        assert!((formula.elements.get(Element::Al).unwrap() - 2.0).abs() <= 1.0e-9);
    }

    #[test]
    fn spinel_oxygen_deficit_becomes_ferric_iron() {
        // Magnetite-like Fe3O4 reported as FeO: 3 Fe on 3 O leaves a one-oxygen
        // deficit per formula unit before the charge-balance correction.
        let scaled = scaled_single_row(
            MeasurementRow::new(0, "A", "1")
                .with_oxide(Element::Fe, 3.0 * 71.85)
                .with_oxide(Element::Mg, 0.0)
                .with_oxide(Element::Al, 0.0),
        );
        let formula = normalize_formula(&scaled, MineralClass::Spinel);
        let split = formula.spinel.expect("spinel split should be computed");

        // cation_sum = 4, trial oxygens = 3/4 * 4 = 3, deficit 1.
        assert!((formula.cation_sum - 4.0).abs() <= 1.0e-9);
        assert!((split.fe3 - 2.0).abs() <= 1.0e-9);
        assert!((split.fe2 - 1.0).abs() <= 1.0e-9);
    }

    #[test]
    fn zero_oxygen_sum_propagates_nan() {
        let scaled =
            scaled_single_row(MeasurementRow::new(0, "A", "1").with_oxide(Element::Mg, 0.0));
        let formula = normalize_formula(&scaled, MineralClass::Olivine);
        assert!(formula.cation_sum.is_nan());
    }
}
