use super::quality::{DECISION_PROMPT, RejectionReport, TOLERANCE_PROMPT};
use super::traits::DecisionSource;
use crate::domain::{EpmaError, EpmaResult};
use std::collections::VecDeque;
use std::io::{BufRead, Write};

const OPERATOR_INPUT_CLOSED: &str = "IO.OPERATOR_INPUT_CLOSED";

/// Batch policy: accepts whatever tolerance the filter starts from.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptingDecisionSource;

impl DecisionSource for AcceptingDecisionSource {
    fn respond(&mut self, _report: &RejectionReport) -> EpmaResult<String> {
        Ok("accept".to_string())
    }

    fn request_tolerance(&mut self) -> EpmaResult<String> {
        Err(EpmaError::internal(
            "SYS.ACCEPTING_SOURCE_RETUNE",
            "batch acceptance never asks for a new tolerance",
        ))
    }
}

/// Replays a fixed list of operator responses and records what it was shown.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecisionSource {
    responses: VecDeque<String>,
    reports: Vec<RejectionReport>,
    notices: Vec<String>,
}

impl ScriptedDecisionSource {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            reports: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.responses.len()
    }

    pub fn reports(&self) -> &[RejectionReport] {
        &self.reports
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    fn next_response(&mut self) -> EpmaResult<String> {
        self.responses.pop_front().ok_or_else(|| {
            EpmaError::io_system(
                OPERATOR_INPUT_CLOSED,
                "scripted operator responses were exhausted before the check finished",
            )
        })
    }
}

impl DecisionSource for ScriptedDecisionSource {
    fn respond(&mut self, report: &RejectionReport) -> EpmaResult<String> {
        self.reports.push(*report);
        self.next_response()
    }

    fn request_tolerance(&mut self) -> EpmaResult<String> {
        self.next_response()
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

/// Line-oriented operator prompt over any reader and writer pair.
#[derive(Debug)]
pub struct TerminalDecisionSource<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalDecisionSource<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn write_block(&mut self, text: &str) -> EpmaResult<()> {
        writeln!(self.output, "{text}")
            .and_then(|_| self.output.flush())
            .map_err(|source| {
                EpmaError::io_system(
                    "IO.OPERATOR_OUTPUT",
                    format!("failed to write operator prompt: {source}"),
                )
            })
    }

    fn read_line(&mut self) -> EpmaResult<String> {
        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(|source| {
            EpmaError::io_system(
                OPERATOR_INPUT_CLOSED,
                format!("failed to read operator response: {source}"),
            )
        })?;
        if read == 0 {
            return Err(EpmaError::io_system(
                OPERATOR_INPUT_CLOSED,
                "operator input closed before a tolerance was accepted",
            ));
        }
        Ok(line)
    }
}

impl<R: BufRead, W: Write> DecisionSource for TerminalDecisionSource<R, W> {
    fn respond(&mut self, report: &RejectionReport) -> EpmaResult<String> {
        self.write_block(&format!("\n{report}\n{DECISION_PROMPT}"))?;
        self.read_line()
    }

    fn request_tolerance(&mut self) -> EpmaResult<String> {
        self.write_block(TOLERANCE_PROMPT)?;
        self.read_line()
    }

    fn notify(&mut self, message: &str) {
        // A prompt that cannot be shown surfaces on the next read or write.
        let _ = self.write_block(message);
    }
}
