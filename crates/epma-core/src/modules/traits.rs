use super::quality::RejectionReport;
use crate::domain::EpmaResult;

/// Supplies the operator's answers to the cation-sum quality check.
///
/// A source may be an interactive terminal, a scripted list of answers, or a
/// batch policy that accepts the configured tolerance outright.
pub trait DecisionSource {
    /// Answer to a rejection summary: accept, change, or a bare tolerance.
    fn respond(&mut self, report: &RejectionReport) -> EpmaResult<String>;

    /// Answer to an explicit request for a new numeric tolerance.
    fn request_tolerance(&mut self) -> EpmaResult<String>;

    fn notify(&mut self, _message: &str) {}
}

impl<T> DecisionSource for &mut T
where
    T: DecisionSource + ?Sized,
{
    fn respond(&mut self, report: &RejectionReport) -> EpmaResult<String> {
        (**self).respond(report)
    }

    fn request_tolerance(&mut self) -> EpmaResult<String> {
        (**self).request_tolerance()
    }

    fn notify(&mut self, message: &str) {
        (**self).notify(message)
    }
}
