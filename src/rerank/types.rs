use serde::{Deserialize, Serialize};

/// One query/passage pair submitted for scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RerankPair {
    /// Query text.
    pub query: String,
    /// Passage text scored against the query.
    pub passage: String,
}

impl RerankPair {
    /// Creates a pair.
    pub fn new(query: impl Into<String>, passage: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            passage: passage.into(),
        }
    }
}

/// Pair/batch-mode input.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    /// Pairs in submission order.
    pub pairs: Vec<RerankPair>,
    /// Apply sigmoid normalization to the output.
    pub normalize: bool,
}

/// Query-rerank-mode input: one query, many passages.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Query text shared by every passage.
    pub query: String,
    /// Passages in submission order.
    pub passages: Vec<String>,
    /// Apply sigmoid normalization to the output.
    pub normalize: bool,
}

/// Positions of a batch that share one query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryGroup {
    /// The shared query.
    pub query: String,
    /// Ascending submission positions of the group's pairs.
    pub member_indices: Vec<usize>,
}

/// Raw backend score for one submitted pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    /// Submission position of the pair.
    pub index: usize,
    /// Score as returned by the backend (never normalized).
    pub raw_score: f32,
}

/// Query-rerank-mode output element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankedItem {
    /// Passage text.
    pub passage: String,
    /// Final score (normalized when requested).
    pub score: f64,
}

/// Pair/batch-mode output.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchScores {
    /// `scores[i]` belongs to `pairs[i]`.
    pub scores: Vec<f64>,
    /// Whether `scores` went through the sigmoid.
    pub normalized: bool,
}
