//! Character-budget truncation for backends that declare one.
//!
//! Truncation is decided per pair: a pair that fits is sent verbatim, and an
//! over-budget pair is trimmed longest-first using only its own lengths. A
//! passage therefore scores the same alone or inside a group.

/// Returns the first `max_chars` Unicode scalar values of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Fits one `(query, passage)` pair into `budget` characters.
///
/// Returns `None` when the pair already fits. Otherwise the longer side is cut
/// first; when both exceed half the budget, each keeps its half.
pub fn fit_pair(query: &str, passage: &str, budget: usize) -> Option<(String, String)> {
    let budget = budget.max(2);
    let query_chars = query.chars().count();
    let passage_chars = passage.chars().count();
    if query_chars + passage_chars <= budget {
        return None;
    }

    let half = budget / 2;
    let (query_len, passage_len) = if query_chars <= half {
        (query_chars, budget - query_chars)
    } else if passage_chars <= budget - half {
        (budget - passage_chars, passage_chars)
    } else {
        (half, budget - half)
    };

    Some((
        truncate_chars(query, query_len).to_string(),
        truncate_chars(passage, passage_len).to_string(),
    ))
}

/// One backend call: a query and the passages scored against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubBatch {
    pub query: String,
    /// Position of each passage in the caller's passage list.
    pub positions: Vec<usize>,
    pub passages: Vec<String>,
}

/// Splits a group into backend calls that respect `budget` per pair.
///
/// Returns `None` when every pair fits. Pairs sharing a (possibly truncated)
/// query land in the same call, in order of first appearance.
pub fn plan_sub_batches(query: &str, passages: &[String], budget: usize) -> Option<Vec<SubBatch>> {
    let fitted: Vec<Option<(String, String)>> = passages
        .iter()
        .map(|p| fit_pair(query, p, budget))
        .collect();
    if fitted.iter().all(Option::is_none) {
        return None;
    }

    let mut batches: Vec<SubBatch> = Vec::new();
    for (position, (original, fit)) in passages.iter().zip(fitted).enumerate() {
        let (pair_query, passage) = match fit {
            Some((q, p)) => (q, p),
            None => (query.to_string(), original.clone()),
        };
        match batches.iter_mut().find(|b| b.query == pair_query) {
            Some(batch) => {
                batch.positions.push(position);
                batch.passages.push(passage);
            }
            None => batches.push(SubBatch {
                query: pair_query,
                positions: vec![position],
                passages: vec![passage],
            }),
        }
    }

    Some(batches)
}
