//! Structural request validation.
//!
//! Runs before any backend interaction. Every text must be non-blank after
//! trimming and at most [`MAX_TEXT_CHARS`] characters; every collection must hold
//! between [`MIN_BATCH_ITEMS`] and [`MAX_BATCH_ITEMS`] items. Collection size is
//! checked before the texts inside it.

pub mod error;


pub use error::{Constraint, ValidationError};

use crate::constants::{MAX_BATCH_ITEMS, MAX_TEXT_CHARS, MIN_BATCH_ITEMS};
use crate::rerank::{BatchRequest, QueryRequest, RerankPair};

/// Checks a single text field.
pub fn validate_text(field: &str, text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::new(field, Constraint::Blank));
    }

    let chars = text.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(ValidationError::new(
            field,
            Constraint::TooLong {
                max: MAX_TEXT_CHARS,
                actual: chars,
            },
        ));
    }

    Ok(())
}

/// Checks a collection size.
pub fn validate_count(field: &str, count: usize) -> Result<(), ValidationError> {
    if count < MIN_BATCH_ITEMS {
        return Err(ValidationError::new(
            field,
            Constraint::TooFew {
                min: MIN_BATCH_ITEMS,
                actual: count,
            },
        ));
    }
    if count > MAX_BATCH_ITEMS {
        return Err(ValidationError::new(
            field,
            Constraint::TooMany {
                max: MAX_BATCH_ITEMS,
                actual: count,
            },
        ));
    }
    Ok(())
}

/// Checks a single-pair request.
pub fn validate_pair(pair: &RerankPair) -> Result<(), ValidationError> {
    validate_text("query", &pair.query)?;
    validate_text("passage", &pair.passage)
}

/// Checks a pair/batch-mode request.
pub fn validate_batch(request: &BatchRequest) -> Result<(), ValidationError> {
    validate_count("pairs", request.pairs.len())?;

    for (i, pair) in request.pairs.iter().enumerate() {
        validate_text(&format!("pairs[{i}].query"), &pair.query)?;
        validate_text(&format!("pairs[{i}].passage"), &pair.passage)?;
    }

    Ok(())
}

/// Checks a query-rerank-mode request.
pub fn validate_query(request: &QueryRequest) -> Result<(), ValidationError> {
    validate_text("query", &request.query)?;
    validate_count("passages", request.passages.len())?;

    for (i, passage) in request.passages.iter().enumerate() {
        validate_text(&format!("passages[{i}]"), passage)?;
    }

    Ok(())
}
