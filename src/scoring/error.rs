use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendError;
use crate::readiness::BackendState;
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("scoring backend not ready (state: {state})")]
    BackendUnavailable { state: BackendState },

    #[error("scoring backend did not answer within {timeout:?}")]
    BackendTimeout { timeout: Duration },

    #[error("internal scoring error: {reason}")]
    InternalScoring { reason: String },

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl ScoringError {
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::InternalScoring {
            reason: reason.into(),
        }
    }
}

pub type ScoringResult<T> = Result<T, ScoringError>;
