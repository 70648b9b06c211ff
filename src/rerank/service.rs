use std::time::Duration;

use tracing::{debug, instrument};

use super::assemble::{assemble_pairs, assemble_ranked};
use super::grouping::{group_by_query, passages_at};
use super::normalize::Normalization;
use super::types::{BatchRequest, BatchScores, QueryRequest, RerankPair, RerankedItem, ScoreResult};
use crate::readiness::ReadinessGate;
use crate::scoring::{ScoringAdapter, ScoringError, ScoringResult};
use crate::validation::{validate_batch, validate_pair, validate_query};

/// Request pipeline: validate, group, score, normalize, assemble.
#[derive(Debug, Clone)]
pub struct RerankService {
    adapter: ScoringAdapter,
}

impl RerankService {
    pub fn new(gate: ReadinessGate, score_timeout: Duration) -> Self {
        Self {
            adapter: ScoringAdapter::new(gate, score_timeout),
        }
    }

    pub fn gate(&self) -> &ReadinessGate {
        self.adapter.gate()
    }

    pub fn adapter(&self) -> &ScoringAdapter {
        &self.adapter
    }

    /// Scores one pair.
    pub async fn score_pair(&self, pair: &RerankPair, normalize: bool) -> ScoringResult<f64> {
        validate_pair(pair)?;

        let raw = self
            .adapter
            .score_batch(&pair.query, std::slice::from_ref(&pair.passage))
            .await?;

        let scores = assemble_pairs(
            1,
            vec![ScoreResult {
                index: 0,
                raw_score: first_score(&raw)?,
            }],
            Normalization::from_flag(normalize),
        )?;
        first_score(&scores)
    }

    /// Scores a batch with one adapter call per distinct query.
    ///
    /// `scores[i]` belongs to `pairs[i]`.
    #[instrument(skip_all, fields(pairs = request.pairs.len()))]
    pub async fn score_batch(&self, request: &BatchRequest) -> ScoringResult<BatchScores> {
        validate_batch(request)?;

        let groups = group_by_query(&request.pairs);
        debug!(groups = groups.len(), "Grouped batch by query");

        let mut results = Vec::with_capacity(request.pairs.len());
        for group in &groups {
            let passages = passages_at(&request.pairs, group);
            let raw = self.adapter.score_batch(&group.query, &passages).await?;

            results.extend(
                group
                    .member_indices
                    .iter()
                    .zip(raw)
                    .map(|(&index, raw_score)| ScoreResult { index, raw_score }),
            );
        }

        let normalization = Normalization::from_flag(request.normalize);
        let scores = assemble_pairs(request.pairs.len(), results, normalization)?;

        Ok(BatchScores {
            scores,
            normalized: normalization.is_normalized(),
        })
    }

    /// Scores every passage against one query, best first.
    #[instrument(skip_all, fields(passages = request.passages.len()))]
    pub async fn rerank_query(&self, request: &QueryRequest) -> ScoringResult<Vec<RerankedItem>> {
        validate_query(request)?;

        let raw = self
            .adapter
            .score_batch(&request.query, &request.passages)
            .await?;

        assemble_ranked(
            request.passages.clone(),
            raw,
            Normalization::from_flag(request.normalize),
        )
    }
}

fn first_score<T: Copy>(scores: &[T]) -> ScoringResult<T> {
    scores
        .first()
        .copied()
        .ok_or_else(|| ScoringError::internal("backend returned no score"))
}
