use mimic_core::WorkflowError;
use thiserror::Error;

/// Failure talking to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid media type {0:?}")]
    InvalidMediaType(String),
    #[error("not authorized")]
    Unauthorized,
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("http status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Why `poll_until_terminal` stopped without a successful terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("no terminal status after {attempts} polls")]
    Timeout { attempts: u32 },
    #[error("job failed: {0}")]
    Failed(String),
    #[error("polling cancelled")]
    Cancelled,
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{0}")]
    Invalid(String),
    #[error("invalid email or password")]
    BadCredentials,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<ApiError> for WorkflowError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => WorkflowError::AuthRequired,
            ApiError::InvalidMediaType(media_type) => {
                WorkflowError::UnsupportedMediaType(media_type)
            }
            ApiError::Rejected { status, message } => {
                WorkflowError::ServerRejected { status, message }
            }
            ApiError::InvalidUrl(message)
            | ApiError::Timeout(message)
            | ApiError::Network(message) => WorkflowError::NetworkFailure(message),
        }
    }
}

impl From<PollError> for WorkflowError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Timeout { attempts } => WorkflowError::Timeout { attempts },
            PollError::Failed(reason) => WorkflowError::Failed(reason),
            PollError::Cancelled => WorkflowError::Cancelled,
            PollError::Api(api) => api.into(),
        }
    }
}
