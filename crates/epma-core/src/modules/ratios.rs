use super::formula::NormalizedFormula;
use crate::domain::{Element, ElementValues, MineralClass, RatioFamily};
use crate::numerics::{population_std, range};
use serde::Serialize;

pub const OLIVINE_RATIOS: [&str; 2] = ["Fo", "Fa"];
pub const PYROXENE_RATIOS: [&str; 4] = ["En", "Fs", "Wo", "Mg#"];
pub const SPINEL_RATIOS: [&str; 2] = ["CrN", "MgN"];

/// Diagnostic ratios. Olivine and pyroxene values are fractions; the spinel
/// numbers are percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "family")]
pub enum MineralRatios {
    Olivine {
        fo: f64,
        fa: f64,
    },
    Pyroxene {
        en: f64,
        fs: f64,
        wo: f64,
        mg_number: f64,
    },
    Spinel {
        cr_number: f64,
        mg_number: f64,
    },
}

impl MineralRatios {
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        let values: Vec<f64> = match *self {
            Self::Olivine { fo, fa } => vec![fo, fa],
            Self::Pyroxene {
                en,
                fs,
                wo,
                mg_number,
            } => vec![en, fs, wo, mg_number],
            Self::Spinel {
                cr_number,
                mg_number,
            } => vec![cr_number, mg_number],
        };
        ratio_names(self.family())
            .iter()
            .copied()
            .zip(values)
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries()
            .into_iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, value)| value)
    }

    pub const fn family(&self) -> RatioFamily {
        match self {
            Self::Olivine { .. } => RatioFamily::Olivine,
            Self::Pyroxene { .. } => RatioFamily::Pyroxene,
            Self::Spinel { .. } => RatioFamily::Spinel,
        }
    }

    /// The ratio a report shows next to the formula: Fo, Mg# or CrN.
    pub fn primary(&self) -> (&'static str, f64) {
        match *self {
            Self::Olivine { fo, .. } => ("Fo", fo),
            Self::Pyroxene { mg_number, .. } => ("Mg#", mg_number),
            Self::Spinel { cr_number, .. } => ("CrN", cr_number),
        }
    }
}

pub const fn ratio_names(family: RatioFamily) -> &'static [&'static str] {
    match family {
        RatioFamily::Olivine => &OLIVINE_RATIOS,
        RatioFamily::Pyroxene => &PYROXENE_RATIOS,
        RatioFamily::Spinel => &SPINEL_RATIOS,
    }
}

pub fn olivine_ratios(elements: &ElementValues) -> MineralRatios {
    let mg = elements.value_or_zero(Element::Mg);
    let fe = elements.value_or_zero(Element::Fe);
    MineralRatios::Olivine {
        fo: mg / (fe + mg),
        fa: fe / (fe + mg),
    }
}

pub fn pyroxene_ratios(elements: &ElementValues) -> MineralRatios {
    let mg = elements.value_or_zero(Element::Mg);
    let fe = elements.value_or_zero(Element::Fe);
    let ca = elements.value_or_zero(Element::Ca);
    let quadrilateral = ca + mg + fe;
    MineralRatios::Pyroxene {
        en: mg / quadrilateral,
        fs: fe / quadrilateral,
        wo: ca / quadrilateral,
        mg_number: mg / (mg + fe),
    }
}

pub fn spinel_ratios(elements: &ElementValues, fe2: f64) -> MineralRatios {
    let cr = elements.value_or_zero(Element::Cr);
    let al = elements.value_or_zero(Element::Al);
    let mg = elements.value_or_zero(Element::Mg);
    MineralRatios::Spinel {
        cr_number: 100.0 * cr / (cr + al),
        mg_number: 100.0 * mg / (fe2 + mg),
    }
}

pub fn compute_ratios(formula: &NormalizedFormula, mineral: MineralClass) -> MineralRatios {
    match mineral.ratio_family() {
        RatioFamily::Olivine => olivine_ratios(&formula.elements),
        RatioFamily::Pyroxene => pyroxene_ratios(&formula.elements),
        RatioFamily::Spinel => {
            let fe2 = formula.spinel.map_or(f64::NAN, |split| split.fe2);
            spinel_ratios(&formula.elements, fe2)
        }
    }
}

/// Aluminium on the tetrahedral site, filling it only up to two cations with Si.
pub fn tetrahedral_aluminium(si: f64, al: f64) -> f64 {
    if si < 2.0 {
        if si + al < 2.0 { al } else { 2.0 - si }
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioSpread {
    pub name: &'static str,
    /// Twice the population standard deviation.
    pub two_sd: f64,
    pub delta: f64,
}

impl RatioSpread {
    pub fn two_sd_label(&self) -> String {
        format!("2SD_{}", self.name)
    }

    pub fn delta_label(&self) -> String {
        format!("delta_{}", self.name)
    }
}

/// Dispersion of every ratio column across `ratios`, which must share one family.
pub fn ratio_uncertainty(ratios: &[MineralRatios]) -> Vec<RatioSpread> {
    let Some(first) = ratios.first() else {
        return Vec::new();
    };

    ratio_names(first.family())
        .iter()
        .map(|&name| {
            let column: Vec<f64> = ratios
                .iter()
                .map(|ratio| ratio.get(name).unwrap_or(f64::NAN))
                .collect();
            RatioSpread {
                name,
                two_sd: 2.0 * population_std(&column),
                delta: range(&column),
            }
        })
        .collect()
}
