//! Crossrank library crate (used by the server and integration tests).
//!
//! # Public API Surface
//!
//! ## Request pipeline
//! - [`RerankService`] - validate, group by query, score, normalize, assemble
//! - [`RerankPair`], [`BatchRequest`], [`QueryRequest`] - inputs
//! - [`BatchScores`], [`RerankedItem`] - outputs
//! - [`ValidationError`] - structural request errors
//!
//! ## Scoring
//! - [`ScoringAdapter`], [`ScoringError`] - gate-checked, deadline-bounded backend calls
//! - [`ModelBackend`], [`Scorer`] - backend capabilities
//! - [`LocalBackend`] (candle), [`RemoteBackend`] (HTTP) - implementations, built by [`build_backend`]
//!
//! ## Readiness
//! - [`Orchestrator`] - startup sequencing, acquisition retry, fallback selection
//! - [`ReadinessGate`], [`BackendState`] - the read side consulted by requests and `/health`
//!
//! ## Configuration
//! - [`Config`], [`BackendConfig`], [`OrchestratorConfig`] - environment-backed settings
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod backend;
pub mod config;
pub mod constants;
pub mod readiness;
pub mod rerank;
pub mod scoring;
pub mod validation;

pub use backend::{
    BackendConfig, BackendError, BackendKind, LocalBackend, ModelBackend, RemoteBackend, Scorer,
    build_backend,
};
#[cfg(any(test, feature = "mock"))]
pub use backend::{MockBackend, placeholder_score};

pub use config::{Config, ConfigError, CorsOrigins};
pub use constants::{
    API_VERSION, DEFAULT_FALLBACK_MODEL, DEFAULT_MODEL, MAX_BATCH_ITEMS, MAX_TEXT_CHARS,
    SERVICE_NAME,
};

#[cfg(any(test, feature = "mock"))]
pub use readiness::MockClock;
pub use readiness::{
    AcquisitionError, BackendState, Clock, Orchestrator, OrchestratorConfig, Readiness,
    ReadinessGate, TokioClock,
};

pub use rerank::{
    BatchRequest, BatchScores, Normalization, QueryRequest, RerankPair, RerankService,
    RerankedItem, sigmoid,
};
pub use scoring::{ScoringAdapter, ScoringError};
pub use validation::{Constraint, ValidationError};
