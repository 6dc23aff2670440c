//! Error taxonomy for the detection pipeline.

use thiserror::Error;

/// Fatal errors from ingestion. Row-level failures are not represented
/// here — they are dropped silently per the ingestion contract.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("missing required columns: {missing_columns:?}")]
    InvalidInput { missing_columns: Vec<String> },
}
