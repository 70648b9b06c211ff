use thiserror::Error;

use super::state::BackendState;

/// Terminal failures of the readiness sequence, plus misuse of the orchestrator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("backend unreachable after {attempts} attempts: {reason}")]
    BackendUnreachable { attempts: u32, reason: String },

    #[error("failed to acquire model {model} after {attempts} attempts: {last_error}")]
    Exhausted {
        model: String,
        attempts: u32,
        last_error: String,
    },

    #[error("model {model} failed verification: {reason}")]
    Verification { model: String, reason: String },

    #[error("illegal readiness transition {from} -> {to}")]
    IllegalTransition {
        from: BackendState,
        to: BackendState,
    },

    #[error("readiness sequence is already running")]
    AlreadyRunning,

    #[error("readiness sequence cannot start from state {state}")]
    NotRetryable { state: BackendState },
}

pub type AcquisitionResult<T> = Result<T, AcquisitionError>;
