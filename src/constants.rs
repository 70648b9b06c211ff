//! Cross-cutting, shared constants.
//!
//! Request limits are enforced by [`crate::validation`]; model defaults feed
//! [`crate::readiness::OrchestratorConfig`].

/// Maximum length of a query or passage, in characters.
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Minimum number of items in a batch (pairs or passages).
pub const MIN_BATCH_ITEMS: usize = 1;

/// Maximum number of items in a batch (pairs or passages).
pub const MAX_BATCH_ITEMS: usize = 100;

/// Token budget for a query+passage pair fed to the local cross-encoder.
pub const MAX_SEQ_LEN: usize = 512;

/// Default character budget for backends that truncate by characters.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 8192;

/// Model requested when `CROSSRANK_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "BAAI/bge-reranker-v2-m3";

/// Model used when the primary model cannot be acquired.
pub const DEFAULT_FALLBACK_MODEL: &str = "cross-encoder/ms-marco-MiniLM-L-6-v2";

/// API version reported by `/health` and `/`.
pub const API_VERSION: &str = "2.0.0";

/// Service name reported by `/`.
pub const SERVICE_NAME: &str = "crossrank";
