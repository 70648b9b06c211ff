use std::sync::Arc;

use tokio::sync::watch;

use super::error::{AcquisitionError, AcquisitionResult};
use super::state::{BackendState, Readiness};
use crate::backend::Scorer;

/// Creates the single publisher and a gate subscribed to it.
pub fn readiness_channel(target_model: &str) -> (ReadinessPublisher, ReadinessGate) {
    let (tx, rx) = watch::channel(Readiness::starting(target_model));
    (ReadinessPublisher { tx }, ReadinessGate { rx })
}

/// Write side of the readiness cell. Owned by the orchestrator only.
#[derive(Debug)]
pub struct ReadinessPublisher {
    tx: watch::Sender<Readiness>,
}

impl ReadinessPublisher {
    pub fn current(&self) -> Readiness {
        self.tx.borrow().clone()
    }

    pub fn state(&self) -> BackendState {
        self.tx.borrow().state
    }

    /// Applies `update` after checking the state transition it makes.
    ///
    /// Readers observe either the old snapshot or the whole new one.
    pub fn transition<F>(&self, next: BackendState, update: F) -> AcquisitionResult<()>
    where
        F: FnOnce(&mut Readiness),
    {
        let mut result = Ok(());
        self.tx.send_modify(|r| {
            if !r.state.can_transition_to(next) {
                result = Err(AcquisitionError::IllegalTransition {
                    from: r.state,
                    to: next,
                });
                return;
            }
            r.state = next;
            update(r);
        });
        result
    }

    pub fn subscribe(&self) -> ReadinessGate {
        ReadinessGate {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read-only view of backend readiness, consulted by every request.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    rx: watch::Receiver<Readiness>,
}

impl ReadinessGate {
    pub fn snapshot(&self) -> Readiness {
        self.rx.borrow().clone()
    }

    pub fn state(&self) -> BackendState {
        self.rx.borrow().state
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// The serving scorer, or the current state if the gate is closed.
    pub fn serving_scorer(&self) -> Result<Arc<dyn Scorer>, BackendState> {
        let readiness = self.rx.borrow();
        match (&readiness.state, &readiness.scorer) {
            (BackendState::Ready, Some(scorer)) => Ok(Arc::clone(scorer)),
            (state, _) => Err(*state),
        }
    }

    /// Waits until the orchestrator reaches `Ready` or `Failed`.
    ///
    /// Returns the current snapshot if the publisher is gone.
    pub async fn settled(&self) -> Readiness {
        let mut rx = self.rx.clone();
        if let Ok(readiness) = rx.wait_for(|r| r.state.is_settled()).await {
            return readiness.clone();
        }
        rx.borrow().clone()
    }
}

#[cfg(any(test, feature = "mock"))]
impl ReadinessGate {
    /// A gate already `Ready` with `scorer`, detached from any orchestrator.
    pub fn serving(scorer: Arc<dyn Scorer>) -> Self {
        let model = scorer.model_name().to_string();
        let (tx, rx) = watch::channel(Readiness {
            state: BackendState::Ready,
            target_model: model.clone(),
            model_name: Some(model),
            via_fallback: false,
            last_error: None,
            scorer: Some(scorer),
        });
        drop(tx);
        Self { rx }
    }

    /// A gate stuck in `state` with no scorer.
    pub fn unavailable(state: BackendState, model: &str) -> Self {
        let mut readiness = Readiness::starting(model);
        readiness.state = state;
        let (tx, rx) = watch::channel(readiness);
        drop(tx);
        Self { rx }
    }
}
