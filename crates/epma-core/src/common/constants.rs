//! Fixed per-element scale factors for the oxide-to-cation conversion.
//!
//! Formula weights are the molar masses of each element's reporting oxide;
//! cation and oxygen counts are the atoms of each per oxide formula unit.

use crate::domain::{ELEMENT_COUNT, Element};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub formula_weight: f64,
    pub cations: f64,
    pub oxygens: f64,
}

const fn factors(formula_weight: f64, cations: f64, oxygens: f64) -> ScaleFactors {
    ScaleFactors {
        formula_weight,
        cations,
        oxygens,
    }
}

/// Indexed by `Element::index`.
pub const ELEMENT_SCALE_FACTORS: [ScaleFactors; ELEMENT_COUNT] = [
    factors(60.08, 1.0, 2.0),
    factors(79.9, 1.0, 2.0),
    factors(101.96, 2.0, 3.0),
    factors(151.99, 2.0, 3.0),
    factors(70.94, 1.0, 1.0),
    factors(40.305, 1.0, 1.0),
    factors(74.7, 1.0, 1.0),
    factors(71.85, 1.0, 1.0),
    factors(56.08, 1.0, 1.0),
    factors(61.98, 2.0, 1.0),
    factors(94.2, 2.0, 1.0),
];

pub const fn scale_factors(element: Element) -> ScaleFactors {
    ELEMENT_SCALE_FACTORS[element.index()]
}

pub const DEFAULT_TOTAL_MIN: f64 = 99.0;
pub const DEFAULT_TOTAL_MAX: f64 = 101.0;
pub const DEFAULT_CATION_TOLERANCE: f64 = 0.01;

#[cfg(test)]
mod tests {
    use super::{ELEMENT_SCALE_FACTORS, scale_factors};
    use crate::domain::Element;

    #[test]
    fn lookup_matches_reference_rows() {
        let silicon = scale_factors(Element::Si);
        assert_eq!(silicon.formula_weight, 60.08);
        assert_eq!((silicon.cations, silicon.oxygens), (1.0, 2.0));

        let aluminium = scale_factors(Element::Al);
        assert_eq!(aluminium.formula_weight, 101.96);
        assert_eq!((aluminium.cations, aluminium.oxygens), (2.0, 3.0));

        let sodium = scale_factors(Element::Na);
        assert_eq!((sodium.cations, sodium.oxygens), (2.0, 1.0));

        assert_eq!(scale_factors(Element::K).formula_weight, 94.2);
    }

    #[test]
    fn every_factor_is_positive_and_finite() {
        for factors in ELEMENT_SCALE_FACTORS {
            for value in [factors.formula_weight, factors.cations, factors.oxygens] {
                assert!(value.is_finite());
                assert!(value > 0.0);
            }
        }
    }
}
