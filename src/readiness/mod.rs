//! Backend readiness orchestration.
//!
//! The [`Orchestrator`] walks the backend through
//! `Starting → WaitingForBackend → CheckingModel → AcquiringModel → Verifying → Ready`,
//! retrying acquisition with cleanup and a fixed delay, and switching to the fallback
//! model (`DegradedFallback`) when the primary cannot be acquired or verified.
//! `Failed` is terminal until [`Orchestrator::retry`].
//!
//! State is published through a `tokio::sync::watch` channel. The orchestrator holds
//! the only [`ReadinessPublisher`]; request handlers and `/health` read through
//! cloned [`ReadinessGate`]s, which only admit traffic in `Ready`.

pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod state;

#[cfg(test)]
mod tests;

#[cfg(any(test, feature = "mock"))]
pub use clock::MockClock;
pub use clock::{Clock, DeadlineElapsed, TokioClock, with_deadline};
pub use config::{
    DEFAULT_ACQUIRE_ATTEMPTS, DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_CONNECT_ATTEMPTS,
    DEFAULT_CONNECT_INTERVAL_SECS, DEFAULT_RETRY_DELAY_SECS, OrchestratorConfig, PollPolicy,
    RetryPolicy,
};
pub use error::{AcquisitionError, AcquisitionResult};
pub use gate::{ReadinessGate, ReadinessPublisher, readiness_channel};
pub use orchestrator::Orchestrator;
pub use state::{BackendState, Readiness};
