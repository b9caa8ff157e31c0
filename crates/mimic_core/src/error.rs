use thiserror::Error;

use crate::Stage;

/// Every failure the wizard can surface.
///
/// `Busy`, `WrongStage`, `PreconditionUnmet` and `Cancelled` reject a call
/// outright and are never stored as the wizard's last error; the rest are recoverable and leave the
/// stage unchanged so the user can retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("unsupported media type {0:?}; please select a video file")]
    UnsupportedMediaType(String),
    #[error("file too large (max {max_bytes} bytes, actual {actual} bytes)")]
    TooLarge { max_bytes: u64, actual: u64 },
    #[error("you must be signed in")]
    AuthRequired,
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("server rejected the request ({status}): {message}")]
    ServerRejected { status: u16, message: String },
    #[error("gave up waiting for the analysis after {attempts} polls")]
    Timeout { attempts: u32 },
    #[error("analysis failed: {0}")]
    Failed(String),
    #[error("another operation is still in progress")]
    Busy,
    #[error("operation requires the {expected} stage, wizard is at {actual}")]
    WrongStage { expected: Stage, actual: Stage },
    #[error("cannot leave the {stage} stage yet")]
    PreconditionUnmet { stage: Stage },
    #[error("workflow was torn down")]
    Cancelled,
}

impl WorkflowError {
    /// Whether this error is recorded as the wizard's last error.
    pub fn is_recorded(&self) -> bool {
        !matches!(
            self,
            WorkflowError::Busy
                | WorkflowError::WrongStage { .. }
                | WorkflowError::PreconditionUnmet { .. }
                | WorkflowError::Cancelled
        )
    }
}
