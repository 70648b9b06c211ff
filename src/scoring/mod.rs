//! Scoring adapter: the request path's view of the backend.
//!
//! [`ScoringAdapter::score_batch`] consults the readiness gate, fits inputs to the
//! backend's character budget, bounds the call with a deadline and checks the
//! result shape. Scores come back raw; normalization is the assembler's job.

pub mod adapter;
pub mod error;
pub mod truncate;


pub use adapter::ScoringAdapter;
pub use error::{ScoringError, ScoringResult};
pub use truncate::{SubBatch, fit_pair, plan_sub_batches, truncate_chars};
