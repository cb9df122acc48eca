//! Domain-level error taxonomy for promptgate.

use promptgate_state::{DraftStatus, StorageError};

use crate::inference::InferenceError;

/// Pipeline errors surfaced by the template store, evaluator, orchestrator and
/// draft workflow.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    #[error("no valid samples for template {template}")]
    NoValidSamples { template: String },

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: DraftStatus, to: DraftStatus },

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("evaluation service is not running")]
    ServiceStopped,

    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        PipelineError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Result type for promptgate domain operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
