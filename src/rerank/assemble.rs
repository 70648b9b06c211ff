use std::cmp::Ordering;

use crate::scoring::ScoringError;

use super::normalize::Normalization;
use super::types::{RerankedItem, ScoreResult};

/// Builds pair/batch-mode output: `scores[i]` belongs to submission position `i`.
///
/// `results` may arrive in any order (one run per query group) but must cover
/// `0..len` exactly once.
pub fn assemble_pairs(
    len: usize,
    results: Vec<ScoreResult>,
    normalization: Normalization,
) -> Result<Vec<f64>, ScoringError> {
    if results.len() != len {
        return Err(ScoringError::internal(format!(
            "expected {len} scores, assembled {}",
            results.len()
        )));
    }

    let mut slots: Vec<Option<f32>> = vec![None; len];
    for result in results {
        let slot = slots.get_mut(result.index).ok_or_else(|| {
            ScoringError::internal(format!("score index {} out of range", result.index))
        })?;
        if slot.replace(result.raw_score).is_some() {
            return Err(ScoringError::internal(format!(
                "duplicate score for index {}",
                result.index
            )));
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            raw.map(|s| normalization.apply(s))
                .ok_or_else(|| ScoringError::internal(format!("missing score for index {i}")))
        })
        .collect()
}

/// Builds query-rerank output sorted by score, highest first.
///
/// Ordering uses the raw scores with a stable sort, so equal scores keep the
/// submission order and sigmoid saturation can never reorder results.
pub fn assemble_ranked(
    passages: Vec<String>,
    raw_scores: Vec<f32>,
    normalization: Normalization,
) -> Result<Vec<RerankedItem>, ScoringError> {
    if passages.len() != raw_scores.len() {
        return Err(ScoringError::internal(format!(
            "expected {} scores, got {}",
            passages.len(),
            raw_scores.len()
        )));
    }

    let mut scored: Vec<(String, f32)> = passages.into_iter().zip(raw_scores).collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    Ok(scored
        .into_iter()
        .map(|(passage, raw)| RerankedItem {
            passage,
            score: normalization.apply(raw),
        })
        .collect())
}
