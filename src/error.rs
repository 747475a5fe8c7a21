use thiserror::Error;

use crate::data::model::Field;

/// Fatal conditions raised by the cleaning and training core.
///
/// Everything recoverable (unparseable numbers, small outlier groups, unseen
/// categories) is handled in place and only logged.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unsupported input format: .{0}")]
    UnsupportedFormat(String),

    #[error("failed to read input: {0}")]
    Ingestion(String),

    #[error("mandatory column '{header}' ({field}) not found in the source header row")]
    MissingMandatoryColumn { field: Field, header: String },

    #[error("no usable target: column {0} is absent or has no values")]
    NoUsableTarget(Field),

    #[error("no feature columns available for model training")]
    NoFeatureColumns,

    #[error("not enough rows for training: need at least {needed}, found {found}")]
    InsufficientRows { needed: usize, found: usize },

    #[error("pipeline has not been fitted")]
    NotFitted,

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
