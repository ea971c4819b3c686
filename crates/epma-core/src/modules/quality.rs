//! Cation-sum quality check with an operator-tuned tolerance.
//!
//! The check is a small state machine. While `AwaitingDecision` it reports how
//! many analyses the current tolerance would reject and waits for the operator
//! to accept, ask to change it, or type a new tolerance directly. `AwaitingTolerance`
//! reprompts until a number is supplied. `Done` applies the filter to the
//! measurement table and the composition result together.

use super::composition::CompositionResult;
use super::traits::DecisionSource;
use crate::common::constants::DEFAULT_CATION_TOLERANCE;
use crate::domain::{EpmaError, EpmaResult, MeasurementTable, MineralClass};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use tracing::{debug, info};

pub const DECISION_PROMPT: &str =
    "Accept this number of discarded values, or change the error limits?";
pub const TOLERANCE_PROMPT: &str = "Enter the new desired value for the error:";
const UNRECOGNIZED_NOTICE: &str = "Please enter yes, no or a new limit";
const NON_NUMERIC_NOTICE: &str = "Please enter a numeric value for the error";
const NEGATIVE_NOTICE: &str = "The error limit must be non-negative";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QualityFilterOptions {
    pub tolerance: f64,
    /// Upper bound on operator prompts; `None` keeps asking indefinitely.
    pub max_prompts: Option<usize>,
}

impl Default for QualityFilterOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_CATION_TOLERANCE,
            max_prompts: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatorDecision {
    Accept,
    Retune,
    Tolerance(f64),
    Unrecognized,
}

pub fn parse_decision(response: &str) -> OperatorDecision {
    let normalized = response.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "accept" | "yes" | "y" => OperatorDecision::Accept,
        "change" | "no" | "n" => OperatorDecision::Retune,
        other => parse_tolerance(other)
            .map(OperatorDecision::Tolerance)
            .unwrap_or(OperatorDecision::Unrecognized),
    }
}

/// A tolerance is any finite, non-negative float.
pub fn parse_tolerance(response: &str) -> EpmaResult<f64> {
    response
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .ok_or_else(|| EpmaError::invalid_operator_input(response))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QualityState {
    AwaitingDecision { tolerance: f64 },
    AwaitingTolerance,
    Done { tolerance: f64 },
}

impl QualityState {
    /// Applies one operator response, returning the next state and any notice
    /// to show before prompting again.
    pub fn next(self, response: &str) -> (Self, Option<&'static str>) {
        match self {
            Self::AwaitingDecision { tolerance } => match parse_decision(response) {
                OperatorDecision::Accept => (Self::Done { tolerance }, None),
                OperatorDecision::Retune => (Self::AwaitingTolerance, None),
                OperatorDecision::Tolerance(value) => {
                    (Self::AwaitingDecision { tolerance: value }, None)
                }
                OperatorDecision::Unrecognized => (self, Some(UNRECOGNIZED_NOTICE)),
            },
            Self::AwaitingTolerance => match parse_tolerance(response) {
                Ok(tolerance) => (Self::AwaitingDecision { tolerance }, None),
                Err(error) => {
                    debug!(%error, "reprompting for tolerance");
                    let negative = response
                        .trim()
                        .parse::<f64>()
                        .is_ok_and(|value| value.is_finite() && value < 0.0);
                    let notice = if negative {
                        NEGATIVE_NOTICE
                    } else {
                        NON_NUMERIC_NOTICE
                    };
                    (self, Some(notice))
                }
            },
            Self::Done { .. } => (self, None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RejectionReport {
    pub mineral: MineralClass,
    pub ideal: f64,
    pub tolerance: f64,
    pub rejected: usize,
    pub total: usize,
}

impl RejectionReport {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.rejected as f64 / self.total as f64
    }
}

impl Display for RejectionReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Currently accepting values within {} ± {}",
            self.ideal, self.tolerance
        )?;
        write!(
            f,
            "Removed {} of {} total samples ({:.3}%) based on current error limit",
            self.rejected,
            self.total,
            self.percentage()
        )
    }
}

/// Indices whose cation sum lies outside `ideal ± tolerance`. NaN sums are rejected.
pub fn rejected_indices(composition: &CompositionResult, tolerance: f64) -> BTreeSet<usize> {
    let ideal = composition.mineral().ideal_cation_sum();
    let (low, high) = (ideal - tolerance, ideal + tolerance);
    composition
        .rows()
        .iter()
        .filter(|row| !(row.cations.sum >= low && row.cations.sum <= high))
        .map(|row| row.index)
        .collect()
}

pub fn rejection_report(composition: &CompositionResult, tolerance: f64) -> RejectionReport {
    RejectionReport {
        mineral: composition.mineral(),
        ideal: composition.mineral().ideal_cation_sum(),
        tolerance,
        rejected: rejected_indices(composition, tolerance).len(),
        total: composition.len(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityOutcome {
    pub tolerance: f64,
    pub rejected: Vec<usize>,
    pub measurements: MeasurementTable,
    pub composition: CompositionResult,
}

/// Drops every out-of-window row from both tables in one step.
pub fn apply_cation_filter(
    measurements: &MeasurementTable,
    composition: &CompositionResult,
    tolerance: f64,
) -> EpmaResult<QualityOutcome> {
    ensure_aligned(measurements, composition)?;
    let removed = rejected_indices(composition, tolerance);
    Ok(QualityOutcome {
        tolerance,
        rejected: removed.iter().copied().collect(),
        measurements: measurements.without_indices(&removed),
        composition: composition.without_indices(&removed),
    })
}

fn ensure_aligned(
    measurements: &MeasurementTable,
    composition: &CompositionResult,
) -> EpmaResult<()> {
    if measurements.indices() != composition.indices() {
        return Err(EpmaError::internal(
            "SYS.QUALITY_INDEX_ALIGNMENT",
            format!(
                "measurement table ({} rows) and composition result ({} rows) do not share row indices",
                measurements.len(),
                composition.len()
            ),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityFilter {
    options: QualityFilterOptions,
}

impl QualityFilter {
    pub fn new(options: QualityFilterOptions) -> Self {
        Self { options }
    }

    pub fn run<S>(
        &self,
        measurements: &MeasurementTable,
        composition: &CompositionResult,
        source: &mut S,
    ) -> EpmaResult<QualityOutcome>
    where
        S: DecisionSource + ?Sized,
    {
        ensure_aligned(measurements, composition)?;
        source.notify(&format!(
            "Cation number quality checking for {} input data",
            composition.mineral()
        ));

        let mut state = QualityState::AwaitingDecision {
            tolerance: self.options.tolerance,
        };
        let mut prompts = 0_usize;

        loop {
            let response = match state {
                QualityState::Done { tolerance } => {
                    let outcome = apply_cation_filter(measurements, composition, tolerance)?;
                    info!(
                        mineral = %composition.mineral(),
                        tolerance,
                        rejected = outcome.rejected.len(),
                        kept = outcome.composition.len(),
                        "cation quality filter applied"
                    );
                    return Ok(outcome);
                }
                QualityState::AwaitingDecision { tolerance } => {
                    self.count_prompt(&mut prompts)?;
                    let report = rejection_report(composition, tolerance);
                    debug!(
                        tolerance,
                        rejected = report.rejected,
                        total = report.total,
                        "awaiting operator decision"
                    );
                    source.respond(&report)?
                }
                QualityState::AwaitingTolerance => {
                    self.count_prompt(&mut prompts)?;
                    source.request_tolerance()?
                }
            };

            let (next, notice) = state.next(&response);
            if let Some(notice) = notice {
                source.notify(notice);
            }
            state = next;
        }
    }

    fn count_prompt(&self, prompts: &mut usize) -> EpmaResult<()> {
        *prompts += 1;
        match self.options.max_prompts {
            Some(limit) if *prompts > limit => Err(EpmaError::input_validation(
                "INPUT.OPERATOR_RETRIES",
                format!(
                    "quality check gave up after {} prompts without an accepted tolerance",
                    limit
                ),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        NEGATIVE_NOTICE, NON_NUMERIC_NOTICE, OperatorDecision, QualityFilter,
        QualityFilterOptions, QualityState, apply_cation_filter, parse_decision, parse_tolerance,
        rejected_indices, rejection_report,
    };
    use crate::domain::errors::INVALID_OPERATOR_INPUT;
    use crate::domain::{Element, MeasurementRow, MeasurementTable, MineralClass};
    use crate::modules::composition::{CompositionResult, compose};
    use crate::modules::decision::ScriptedDecisionSource;
    use std::collections::BTreeSet;

    fn forsterite(index: usize, silica: f64) -> MeasurementRow {
        MeasurementRow::new(index, "S1", "a")
            .with_oxide(Element::Si, silica)
            .with_oxide(Element::Mg, 2.0 * 40.305)
    }

    /// Rows 0 and 1 are stoichiometric; 2 and 3 are silica-rich and fall below three cations.
    fn fixture() -> (MeasurementTable, CompositionResult) {
        let table = MeasurementTable::new(vec![
            forsterite(0, 60.08),
            forsterite(1, 60.08),
            forsterite(2, 1.3 * 60.08),
            forsterite(3, 1.6 * 60.08),
        ]);
        let composition = compose(&table, MineralClass::Olivine);
        (table, composition)
    }

    #[test]
    fn decisions_are_case_and_whitespace_tolerant() {
        assert_eq!(parse_decision("Yes  \n"), OperatorDecision::Accept);
        assert_eq!(parse_decision("ACCEPT"), OperatorDecision::Accept);
        assert_eq!(parse_decision("n"), OperatorDecision::Retune);
        assert_eq!(parse_decision("Change\t"), OperatorDecision::Retune);
        assert_eq!(parse_decision("0.05 "), OperatorDecision::Tolerance(0.05));
        assert_eq!(parse_decision("3"), OperatorDecision::Tolerance(3.0));
        assert_eq!(parse_decision("maybe"), OperatorDecision::Unrecognized);
        assert_eq!(parse_decision("-0.1"), OperatorDecision::Unrecognized);
        assert_eq!(parse_decision("1.2.3"), OperatorDecision::Unrecognized);
    }

    #[test]
    fn non_numeric_tolerance_is_invalid_operator_input() {
        let error = parse_tolerance("abc").expect_err("letters are not a tolerance");
        assert_eq!(error.placeholder(), INVALID_OPERATOR_INPUT);
        assert_eq!(parse_tolerance(" 0.2 ").unwrap(), 0.2);
        assert!(parse_tolerance("inf").is_err());
    }

    #[test]
    fn state_machine_transitions() {
        let start = QualityState::AwaitingDecision { tolerance: 0.01 };
        assert_eq!(start.next("y").0, QualityState::Done { tolerance: 0.01 });
        assert_eq!(start.next("no").0, QualityState::AwaitingTolerance);
        assert_eq!(
            start.next("0.3").0,
            QualityState::AwaitingDecision { tolerance: 0.3 }
        );

        let (same, notice) = start.next("what");
        assert_eq!(same, start);
        assert!(notice.is_some());

        let (still_waiting, notice) = QualityState::AwaitingTolerance.next("lots");
        assert_eq!(still_waiting, QualityState::AwaitingTolerance);
        assert!(notice.is_some());
        assert_eq!(
            QualityState::AwaitingTolerance.next("0.2").0,
            QualityState::AwaitingDecision { tolerance: 0.2 }
        );
    }

    #[test]
    fn negative_tolerance_gets_its_own_notice() {
        let (still_waiting, notice) = QualityState::AwaitingTolerance.next("-0.5");
        assert_eq!(still_waiting, QualityState::AwaitingTolerance);
        assert_eq!(notice, Some(NEGATIVE_NOTICE));

        let (_, notice) = QualityState::AwaitingTolerance.next("wide");
        assert_eq!(notice, Some(NON_NUMERIC_NOTICE));
    }

    #[test]
    fn nan_cation_sum_is_always_rejected() {
        let table = MeasurementTable::new(vec![
            MeasurementRow::new(0, "S1", "a").with_oxide(Element::Mg, 0.0),
            forsterite(1, 60.08),
        ]);
        let composition = compose(&table, MineralClass::Olivine);
        assert!(composition.rows()[0].cations.sum.is_nan());

        let rejected = rejected_indices(&composition, 100.0);
        assert!(rejected.contains(&0));
        assert!(!rejected.contains(&1));

        let outcome = apply_cation_filter(&table, &composition, 100.0)
            .expect("tables built together stay aligned");
        assert_eq!(outcome.rejected, vec![0]);
        assert_eq!(outcome.measurements.indices(), BTreeSet::from([1]));
        assert_eq!(outcome.composition.indices(), BTreeSet::from([1]));
    }

    #[test]
    fn report_counts_rejections_at_tolerance() {
        let (_, composition) = fixture();
        let report = rejection_report(&composition, 0.01);

        assert_eq!(report.ideal, 3.0);
        assert_eq!(report.total, 4);
        assert_eq!(report.rejected, 2);
        assert_eq!(report.percentage(), 50.0);
        assert!(report.to_string().contains("Removed 2 of 4 total samples (50.000%)"));
        assert!(report.to_string().starts_with("Currently accepting values within 3 ± 0.01"));
    }

    #[test]
    fn scripted_operator_retunes_then_accepts() {
        let (table, composition) = fixture();
        let mut source = ScriptedDecisionSource::new(["maybe", "change", "abc", "0.2", "y"]);

        let outcome = QualityFilter::new(QualityFilterOptions::default())
            .run(&table, &composition, &mut source)
            .expect("quality check should finish");

        assert_eq!(outcome.tolerance, 0.2);
        assert_eq!(outcome.measurements.indices(), outcome.composition.indices());
        assert_eq!(outcome.rejected, vec![3]);
        assert_eq!(source.remaining(), 0);
        assert_eq!(source.notices().len(), 3);
    }

    #[test]
    fn bare_tolerance_reply_recomputes_before_accepting() {
        let (table, composition) = fixture();
        let mut source = ScriptedDecisionSource::new(["0.01", "accept"]);

        let outcome = QualityFilter::new(QualityFilterOptions {
            tolerance: 1.0,
            max_prompts: None,
        })
        .run(&table, &composition, &mut source)
        .expect("quality check should finish");

        assert_eq!(outcome.tolerance, 0.01);
        assert_eq!(outcome.rejected, vec![2, 3]);
        assert_eq!(source.reports()[0].rejected, 0);
        assert_eq!(source.reports()[1].rejected, 2);
    }

    #[test]
    fn prompt_limit_stops_endless_garbage() {
        let (table, composition) = fixture();
        let mut source = ScriptedDecisionSource::new(["?", "?", "?", "?"]);

        let error = QualityFilter::new(QualityFilterOptions {
            tolerance: 0.01,
            max_prompts: Some(3),
        })
        .run(&table, &composition, &mut source)
        .expect_err("prompt limit should end the loop");

        assert_eq!(error.placeholder(), "INPUT.OPERATOR_RETRIES");
    }

    #[test]
    fn filtering_is_idempotent() {
        let (table, composition) = fixture();
        let first = apply_cation_filter(&table, &composition, 0.01).unwrap();
        let second = apply_cation_filter(&first.measurements, &first.composition, 0.01).unwrap();

        assert!(second.rejected.is_empty());
        assert_eq!(second.measurements, first.measurements);
        assert!(rejected_indices(&first.composition, 0.01).is_empty());
    }

    #[test]
    fn misaligned_inputs_are_refused() {
        let (table, composition) = fixture();
        let shorter = table.without_indices(&[0].into_iter().collect());
        let error = apply_cation_filter(&shorter, &composition, 0.01)
            .expect_err("index sets differ");
        assert_eq!(error.placeholder(), "SYS.QUALITY_INDEX_ALIGNMENT");
    }
}
