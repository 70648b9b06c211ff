use std::time::Duration;

use tracing::{debug, warn};

use super::error::{ScoringError, ScoringResult};
use super::truncate::plan_sub_batches;
use crate::backend::{BackendError, Scorer};
use crate::readiness::ReadinessGate;

/// Gate-checked, deadline-bounded access to the serving scorer.
#[derive(Debug, Clone)]
pub struct ScoringAdapter {
    gate: ReadinessGate,
    timeout: Duration,
}

impl ScoringAdapter {
    pub fn new(gate: ReadinessGate, timeout: Duration) -> Self {
        Self { gate, timeout }
    }

    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Scores `passages` against `query`: one score per passage, in passage order.
    ///
    /// Over-budget pairs are truncated on their own and may be sent as separate
    /// backend calls; each call gets the full deadline.
    pub async fn score_batch(&self, query: &str, passages: &[String]) -> ScoringResult<Vec<f32>> {
        let scorer = self
            .gate
            .serving_scorer()
            .map_err(|state| ScoringError::BackendUnavailable { state })?;

        let plan = scorer
            .max_input_chars()
            .and_then(|budget| plan_sub_batches(query, passages, budget));
        let Some(batches) = plan else {
            return self.call(scorer.as_ref(), query, passages).await;
        };

        debug!(
            model = scorer.model_name(),
            calls = batches.len(),
            "Truncated inputs to backend budget"
        );

        let mut scores = vec![0.0_f32; passages.len()];
        for batch in &batches {
            let batch_scores = self
                .call(scorer.as_ref(), &batch.query, &batch.passages)
                .await?;
            for (&position, score) in batch.positions.iter().zip(batch_scores) {
                scores[position] = score;
            }
        }

        Ok(scores)
    }

    async fn call(
        &self,
        scorer: &dyn Scorer,
        query: &str,
        passages: &[String],
    ) -> ScoringResult<Vec<f32>> {
        let scores = tokio::time::timeout(self.timeout, scorer.score_batch(query, passages))
            .await
            .map_err(|_| {
                warn!(model = scorer.model_name(), timeout = ?self.timeout, "Scoring call timed out");
                ScoringError::BackendTimeout {
                    timeout: self.timeout,
                }
            })?
            .map_err(|e| match e {
                BackendError::InvalidResponse { reason } => ScoringError::InternalScoring { reason },
                other => ScoringError::Backend(other),
            })?;

        if scores.len() != passages.len() {
            return Err(ScoringError::internal(format!(
                "backend returned {} scores for {} passages",
                scores.len(),
                passages.len()
            )));
        }
        if let Some(pos) = scores.iter().position(|s| !s.is_finite()) {
            return Err(ScoringError::internal(format!(
                "backend returned non-finite score at position {pos}"
            )));
        }

        Ok(scores)
    }
}
