use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, instrument, warn};

use super::clock::{Clock, DeadlineElapsed, TokioClock, with_deadline};
use super::config::{OrchestratorConfig, PollPolicy, RetryPolicy};
use super::error::{AcquisitionError, AcquisitionResult};
use super::gate::{ReadinessGate, ReadinessPublisher, readiness_channel};
use super::state::{BackendState, Readiness};
use crate::backend::{ModelBackend, Scorer};

/// Drives the backend from `Starting` to `Ready` (or `Failed`) and publishes
/// every step through the readiness gate.
pub struct Orchestrator {
    config: OrchestratorConfig,
    backend: Arc<dyn ModelBackend>,
    clock: Arc<dyn Clock>,
    publisher: ReadinessPublisher,
    running: AtomicBool,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("backend", &self.backend.kind())
            .field("state", &self.state())
            .finish()
    }
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, backend: Arc<dyn ModelBackend>) -> Self {
        Self::new_with_clock(config, backend, Arc::new(TokioClock))
    }

    /// Creates an orchestrator with an explicit [`Clock`] for retry delays and deadlines.
    pub fn new_with_clock(
        config: OrchestratorConfig,
        backend: Arc<dyn ModelBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (publisher, _) = readiness_channel(&config.primary_model);
        Self {
            config,
            backend,
            clock,
            publisher,
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn ModelBackend> {
        &self.backend
    }

    /// A new read-only handle on the readiness state.
    pub fn gate(&self) -> ReadinessGate {
        self.publisher.subscribe()
    }

    pub fn state(&self) -> BackendState {
        self.publisher.state()
    }

    pub fn snapshot(&self) -> Readiness {
        self.publisher.current()
    }

    /// Runs the readiness sequence once, from `Starting`.
    ///
    /// Returns the name of the model now being served.
    #[instrument(skip(self), fields(model = %self.config.primary_model))]
    pub async fn run(&self) -> AcquisitionResult<String> {
        self.exclusive(BackendState::Starting).await
    }

    /// Re-runs the sequence after a `Failed` outcome.
    ///
    /// Library entry point for embedders that own an [`Orchestrator`]. The
    /// server binary does not expose it; a failed server is restarted instead.
    #[instrument(skip(self), fields(model = %self.config.primary_model))]
    pub async fn retry(&self) -> AcquisitionResult<String> {
        self.exclusive(BackendState::Failed).await
    }

    /// Runs [`Orchestrator::run`] on a background task.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            match self.run().await {
                Ok(model) => info!(model = %model, "Scoring backend ready"),
                Err(e) => error!(error = %e, "Scoring backend failed to become ready"),
            }
        })
    }

    async fn exclusive(&self, from: BackendState) -> AcquisitionResult<String> {
        // AcqRel: only one caller may observe `false` and own the sequence.
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(AcquisitionError::AlreadyRunning);
        }

        let state = self.state();
        let result = if state == from {
            self.sequence().await
        } else {
            Err(AcquisitionError::NotRetryable { state })
        };

        self.running.store(false, Ordering::Release);
        result
    }

    async fn sequence(&self) -> AcquisitionResult<String> {
        let result = self.drive().await;

        if let Err(e) = &result {
            let reason = e.to_string();
            if let Err(illegal) = self.advance(BackendState::Failed, |r| {
                r.scorer = None;
                r.last_error = Some(reason);
            }) {
                warn!(error = %illegal, "Could not record readiness failure");
            }
        }
        result
    }

    async fn drive(&self) -> AcquisitionResult<String> {
        self.advance(BackendState::WaitingForBackend, |r| {
            r.model_name = None;
            r.via_fallback = false;
            r.last_error = None;
            r.scorer = None;
        })?;
        self.wait_for_backend().await?;

        let primary = self.config.primary_model.clone();
        let primary_err = match self.prepare_primary(&primary).await {
            Ok(scorer) => return self.publish_ready(&primary, scorer, false),
            Err(e @ (AcquisitionError::Exhausted { .. } | AcquisitionError::Verification { .. })) => e,
            Err(e) => return Err(e),
        };

        let Some(fallback) = self.config.fallback_model.clone() else {
            return Err(primary_err);
        };

        warn!(
            primary = %primary,
            fallback = %fallback,
            error = %primary_err,
            "Primary model unavailable, switching to fallback"
        );
        let reason = primary_err.to_string();
        self.advance(BackendState::DegradedFallback, |r| {
            r.model_name = Some(fallback.clone());
            r.via_fallback = true;
            r.last_error = Some(reason);
        })?;

        if !self.is_present(&fallback).await {
            self.acquire_with_retry(&fallback).await?;
        }
        let scorer = self.verify(&fallback).await?;
        self.publish_ready(&fallback, scorer, true)
    }

    async fn prepare_primary(&self, model: &str) -> AcquisitionResult<Arc<dyn Scorer>> {
        self.advance(BackendState::CheckingModel, |r| {
            r.model_name = Some(model.to_string());
        })?;

        if self.is_present(model).await {
            info!(model, "Model already present, skipping acquisition");
        } else {
            self.advance(BackendState::AcquiringModel, |_| {})?;
            self.acquire_with_retry(model).await?;
        }

        self.verify(model).await
    }

    async fn wait_for_backend(&self) -> AcquisitionResult<()> {
        let PollPolicy { attempts, interval } = self.config.poll;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match with_deadline(&*self.clock, interval, self.backend.ping()).await {
                Ok(Ok(())) => {
                    info!(attempt, "Scoring backend reachable");
                    return Ok(());
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(DeadlineElapsed) => last_error = format!("ping timed out after {interval:?}"),
            }

            debug!(attempt, attempts, error = %last_error, "Scoring backend not reachable yet");
            if attempt < attempts {
                self.clock.sleep(interval).await;
            }
        }

        Err(AcquisitionError::BackendUnreachable {
            attempts,
            reason: last_error,
        })
    }

    /// Presence check; an erroring or slow check counts as absent.
    async fn is_present(&self, model: &str) -> bool {
        let deadline = self.config.retry.attempt_timeout;
        match with_deadline(&*self.clock, deadline, self.backend.has_model(model)).await {
            Ok(Ok(present)) => present,
            Ok(Err(e)) => {
                warn!(model, error = %e, "Model presence check failed");
                false
            }
            Err(DeadlineElapsed) => {
                warn!(model, "Model presence check timed out");
                false
            }
        }
    }

    async fn acquire_with_retry(&self, model: &str) -> AcquisitionResult<()> {
        let RetryPolicy {
            max_attempts,
            attempt_timeout,
            retry_delay,
        } = self.config.retry;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            info!(model, attempt, max_attempts, "Acquiring model");

            let failure =
                match with_deadline(&*self.clock, attempt_timeout, self.backend.acquire(model)).await {
                    Ok(Ok(())) => {
                        info!(model, attempt, "Model acquired");
                        return Ok(());
                    }
                    Ok(Err(e)) => e.to_string(),
                    Err(DeadlineElapsed) => format!("attempt timed out after {attempt_timeout:?}"),
                };

            warn!(model, attempt, max_attempts, error = %failure, "Model acquisition attempt failed");
            if let Err(e) = self.backend.cleanup(model).await {
                warn!(model, error = %e, "Failed to clean up partial model");
            }
            last_error = failure;

            if attempt < max_attempts {
                self.clock.sleep(retry_delay).await;
            }
        }

        Err(AcquisitionError::Exhausted {
            model: model.to_string(),
            attempts: max_attempts,
            last_error,
        })
    }

    async fn verify(&self, model: &str) -> AcquisitionResult<Arc<dyn Scorer>> {
        self.advance(BackendState::Verifying, |r| {
            r.model_name = Some(model.to_string());
        })?;

        let deadline = self.config.retry.attempt_timeout;
        match with_deadline(&*self.clock, deadline, self.backend.load(model)).await {
            Ok(Ok(scorer)) => Ok(scorer),
            Ok(Err(e)) => Err(AcquisitionError::Verification {
                model: model.to_string(),
                reason: e.to_string(),
            }),
            Err(DeadlineElapsed) => Err(AcquisitionError::Verification {
                model: model.to_string(),
                reason: format!("load timed out after {deadline:?}"),
            }),
        }
    }

    fn publish_ready(
        &self,
        model: &str,
        scorer: Arc<dyn Scorer>,
        via_fallback: bool,
    ) -> AcquisitionResult<String> {
        self.advance(BackendState::Ready, |r| {
            r.model_name = Some(model.to_string());
            r.via_fallback = via_fallback;
            r.scorer = Some(scorer);
            if !via_fallback {
                r.last_error = None;
            }
        })?;
        Ok(model.to_string())
    }

    fn advance<F>(&self, next: BackendState, update: F) -> AcquisitionResult<()>
    where
        F: FnOnce(&mut Readiness),
    {
        let from = self.publisher.state();
        self.publisher.transition(next, update)?;
        info!(from = %from, to = %next, "Backend state transition");
        Ok(())
    }
}
