pub mod averaging;
pub mod composition;
pub mod decision;
pub mod formula;
pub mod ingest;
pub mod pipeline;
pub mod quality;
pub mod ratios;
pub mod report;
pub mod scaler;
pub mod serialization;
pub mod summary;

mod traits;

pub use averaging::{
    AggregatedRow, AggregatedTable, AggregationLevel, average_over_areas, average_over_samples,
};
pub use composition::{CompositionResult, CompositionRow, compose};
pub use decision::{AcceptingDecisionSource, ScriptedDecisionSource, TerminalDecisionSource};
pub use ingest::{
    IngestError, IngestOptions, IngestReport, read_measurements, read_measurements_path,
};
pub use pipeline::{PipelineOptions, PipelineOutcome, StageResult, run_pipeline};
pub use quality::{
    QualityFilter, QualityFilterOptions, QualityOutcome, QualityState, RejectionReport,
};
pub use report::{ReportStage, ReportTable};
pub use summary::{RatioEnvelope, SampleRatioSummary, pair_envelopes, summarize_ratios};
pub use traits::DecisionSource;
