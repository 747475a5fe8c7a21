/// Management-reporting views over the cleaned waste log.
pub mod aggregate;
pub mod stats;

pub use aggregate::{
    build_summaries, AnalysisOutputs, LineOperatorSummary, LineSummary, OperatorSummary,
};
