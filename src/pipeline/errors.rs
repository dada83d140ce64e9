//! Error types of the pipeline
//!
//! Domain conditions met during a walk (missing keys, absent staves, unknown
//! movements) are not errors; these are failures at the driver boundary.

use thiserror::Error;

use crate::converters::MilestoneError;
use crate::models::TreeError;
use crate::transposition::TranspositionError;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Invalid transposition: {0}")]
    InvalidTransposition(#[from] TranspositionError),

    /// Cast-off works on systems, which only page-based documents have
    #[error("Document is not page-based")]
    NotPageBased,

    #[error("Pass '{pass}' stopped before completing")]
    PassAborted { pass: &'static str },

    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] TreeError),

    #[error("Malformed milestones: {0}")]
    MalformedMilestones(#[from] MilestoneError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TransformError>;
