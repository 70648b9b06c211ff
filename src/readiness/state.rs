use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::Scorer;

/// Readiness state of the scoring backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendState {
    Starting,
    WaitingForBackend,
    CheckingModel,
    AcquiringModel,
    DegradedFallback,
    Verifying,
    Ready,
    Failed,
}

impl BackendState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::WaitingForBackend => "waiting_for_backend",
            Self::CheckingModel => "checking_model",
            Self::AcquiringModel => "acquiring_model",
            Self::DegradedFallback => "degraded_fallback",
            Self::Verifying => "verifying",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` if the orchestrator may move from `self` to `next`.
    pub fn can_transition_to(&self, next: BackendState) -> bool {
        use BackendState::*;

        matches!(
            (self, next),
            (Starting, WaitingForBackend)
                | (WaitingForBackend, CheckingModel | Failed)
                | (CheckingModel, AcquiringModel | Verifying | Failed)
                | (AcquiringModel, Verifying | DegradedFallback | Failed)
                | (DegradedFallback, Verifying | Failed)
                | (Verifying, Ready | DegradedFallback | Failed)
                | (Failed, WaitingForBackend)
        )
    }

    /// `Ready` or `Failed`: the orchestrator has stopped moving.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    pub fn is_ready(&self) -> bool {
        *self == Self::Ready
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot published by the orchestrator.
///
/// State, resolved model and serving handle change together, so a reader never
/// sees `Ready` without a scorer or a scorer for a model other than `model_name`.
#[derive(Clone)]
pub struct Readiness {
    pub state: BackendState,
    /// Configured primary model.
    pub target_model: String,
    /// Model being acquired or served; differs from `target_model` on the fallback path.
    pub model_name: Option<String>,
    pub via_fallback: bool,
    pub last_error: Option<String>,
    pub scorer: Option<Arc<dyn Scorer>>,
}

impl Readiness {
    pub fn starting(target_model: &str) -> Self {
        Self {
            state: BackendState::Starting,
            target_model: target_model.to_string(),
            model_name: None,
            via_fallback: false,
            last_error: None,
            scorer: None,
        }
    }

    /// Model reported to clients: the resolved model, else the configured one.
    pub fn reported_model(&self) -> &str {
        self.model_name.as_deref().unwrap_or(&self.target_model)
    }
}

impl fmt::Debug for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Readiness")
            .field("state", &self.state)
            .field("target_model", &self.target_model)
            .field("model_name", &self.model_name)
            .field("via_fallback", &self.via_fallback)
            .field("last_error", &self.last_error)
            .field("scorer", &self.scorer.as_ref().map(|s| s.model_name().to_string()))
            .finish()
    }
}
