use thiserror::Error;

/// Errors raised by a scoring backend (local model or remote service).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unreachable at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("backend returned HTTP {status} for {endpoint}: {body}")]
    Http {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("model not available: {model}")]
    ModelNotFound { model: String },

    #[error("failed to acquire model {model}: {reason}")]
    AcquisitionFailed { model: String, reason: String },

    #[error("failed to load model: {reason}")]
    ModelLoadFailed { reason: String },

    #[error("inference failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("tokenization failed: {reason}")]
    TokenizationFailed { reason: String },

    #[error("malformed backend response: {reason}")]
    InvalidResponse { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<candle_core::Error> for BackendError {
    fn from(err: candle_core::Error) -> Self {
        BackendError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}
