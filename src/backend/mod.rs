//! Scoring backends.
//!
//! A backend is chosen once when the process is composed ([`build_backend`]) and is
//! used through two capabilities:
//!
//! - [`ModelBackend`]: lifecycle operations driven by the readiness orchestrator
//!   (connectivity, presence, acquisition, cleanup, verification).
//! - [`Scorer`]: the serving handle produced by a successful verification,
//!   `score_batch(query, passages) -> scores`.
//!
//! Implementations:
//! - [`local`]: in-process candle cross-encoder, models pulled from the Hugging Face hub.
//! - [`remote`]: an inference service reached over HTTP.
//! - [`mock`]: scripted backend for tests (`mock` feature).

pub mod config;
pub mod error;
pub mod factory;
pub mod local;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;

pub use config::{BackendConfig, BackendKind, DEFAULT_MODEL_CACHE, DEFAULT_REMOTE_URL};
pub use error::BackendError;
pub use factory::build_backend;
pub use local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockBackend, placeholder_score};
pub use remote::RemoteBackend;

/// Serving handle bound to one verified model.
///
/// `score_batch` must return exactly one score per passage, in passage order.
/// Implementations over a non-reentrant model serialize calls internally.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Identifier of the model this handle scores with.
    fn model_name(&self) -> &str;

    /// Character budget for one query+passage pair, if the backend has one.
    ///
    /// `None` means the backend truncates on its own (e.g. at the tokenizer).
    fn max_input_chars(&self) -> Option<usize> {
        None
    }

    /// Scores every passage against `query`.
    async fn score_batch(&self, query: &str, passages: &[String])
    -> Result<Vec<f32>, BackendError>;
}

/// Lifecycle operations used by the readiness orchestrator.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Implementation kind, for status reporting.
    fn kind(&self) -> BackendKind;

    /// Compute device label (`cpu`, `cuda`, `metal`, `remote`, ...).
    fn device(&self) -> String;

    /// Succeeds once the backend can accept lifecycle calls.
    async fn ping(&self) -> Result<(), BackendError>;

    /// Returns `true` if `model` is already present (cache, volume, or service).
    async fn has_model(&self, model: &str) -> Result<bool, BackendError>;

    /// Downloads or pulls `model`.
    async fn acquire(&self, model: &str) -> Result<(), BackendError>;

    /// Removes any partial artifact left by a failed acquisition of `model`.
    async fn cleanup(&self, model: &str) -> Result<(), BackendError>;

    /// Confirms `model` is loadable and returns a serving handle for it.
    async fn load(&self, model: &str) -> Result<Arc<dyn Scorer>, BackendError>;
}
