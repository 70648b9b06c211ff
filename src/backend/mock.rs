//! Scripted backend for tests.
//!
//! Clones share state, so a test can hand one clone to the orchestrator and
//! keep another to script failures and read call counters.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{BackendError, BackendKind, ModelBackend, Scorer};

type ScoreFn = Arc<dyn Fn(&str, &str) -> f32 + Send + Sync>;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "can", "to",
    "of", "in", "for", "on", "with", "at", "by", "from", "as", "into", "through", "about", "all",
    "each", "more", "most", "other", "some", "such", "no", "not", "only", "so", "than", "too",
    "very", "just", "and", "but", "if", "or", "because", "what", "which", "who", "this", "that",
    "these", "those", "it", "its",
];

const STEM_PREFIX: usize = 5;

fn content_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Equal words, or words sharing a five-character prefix ("learning", "learns").
fn words_match(a: &str, b: &str) -> bool {
    a == b
        || a.chars()
            .zip(b.chars())
            .take_while(|(x, y)| x == y)
            .count()
            >= STEM_PREFIX
}

/// Deterministic lexical-overlap logit standing in for a cross-encoder.
///
/// Roughly in `[-4, 4]`; disjoint texts land at the bottom.
pub fn placeholder_score(query: &str, passage: &str) -> f32 {
    let query_words = content_words(query);
    let passage_words = content_words(passage);

    if query_words.is_empty() {
        let len_ratio = (query.len().min(passage.len()) as f32)
            / (query.len().max(passage.len()).max(1) as f32);
        return 8.0 * (0.3 * len_ratio - 0.5);
    }

    let matches = query_words
        .iter()
        .filter(|q| passage_words.iter().any(|p| words_match(q, p)))
        .count();
    let recall = matches as f32 / query_words.len() as f32;

    let union = query_words.len() + passage_words.len() - matches;
    let jaccard = if union > 0 {
        matches as f32 / union as f32
    } else {
        0.0
    };

    8.0 * (0.6 * recall + 0.4 * jaccard - 0.5)
}

#[derive(Default)]
struct MockState {
    present: Mutex<HashSet<String>>,
    ping_failures: AtomicU32,
    pings: AtomicU32,
    acquire_failures: Mutex<HashMap<String, u32>>,
    unacquirable: Mutex<HashSet<String>>,
    hanging: Mutex<HashSet<String>>,
    unverifiable: Mutex<HashSet<String>>,
    acquire_attempts: Mutex<HashMap<String, u32>>,
    cleanup_calls: Mutex<HashMap<String, u32>>,
    score_fn: Mutex<Option<ScoreFn>>,
    scorer_delay: Mutex<Option<Duration>>,
    short_output: AtomicBool,
    max_input_chars: Mutex<Option<usize>>,
    score_calls: AtomicUsize,
    scored_inputs: Mutex<Vec<(String, Vec<String>)>>,
}

/// In-memory [`ModelBackend`] whose failures are scripted per model.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<MockState>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("present", &*self.state.present.lock())
            .finish()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `model` as already present (no acquisition needed).
    pub fn with_model(self, model: &str) -> Self {
        self.state.present.lock().insert(model.to_string());
        self
    }

    /// The first `n` pings fail.
    pub fn failing_pings(self, n: u32) -> Self {
        self.state.ping_failures.store(n, Ordering::SeqCst);
        self
    }

    /// The first `n` acquisitions of `model` fail; later ones succeed.
    pub fn failing_acquires(self, model: &str, n: u32) -> Self {
        self.state
            .acquire_failures
            .lock()
            .insert(model.to_string(), n);
        self
    }

    /// Every acquisition of `model` fails.
    pub fn unacquirable(self, model: &str) -> Self {
        self.state.unacquirable.lock().insert(model.to_string());
        self
    }

    /// Acquisitions of `model` never complete.
    pub fn hanging_acquire(self, model: &str) -> Self {
        self.state.hanging.lock().insert(model.to_string());
        self
    }

    /// Loading `model` fails even when present.
    pub fn failing_verification(self, model: &str) -> Self {
        self.state.unverifiable.lock().insert(model.to_string());
        self
    }

    /// Replaces [`placeholder_score`] as the scoring function.
    pub fn with_score_fn<F>(self, f: F) -> Self
    where
        F: Fn(&str, &str) -> f32 + Send + Sync + 'static,
    {
        *self.state.score_fn.lock() = Some(Arc::new(f));
        self
    }

    /// Every scoring call sleeps for `delay` before answering.
    pub fn with_scorer_delay(self, delay: Duration) -> Self {
        *self.state.scorer_delay.lock() = Some(delay);
        self
    }

    /// Scoring calls drop the last score.
    pub fn with_short_output(self) -> Self {
        self.state.short_output.store(true, Ordering::SeqCst);
        self
    }

    /// Scorers declare a per-pair character budget.
    pub fn with_max_input_chars(self, budget: usize) -> Self {
        *self.state.max_input_chars.lock() = Some(budget);
        self
    }

    pub fn is_present(&self, model: &str) -> bool {
        self.state.present.lock().contains(model)
    }

    pub fn ping_calls(&self) -> u32 {
        self.state.pings.load(Ordering::SeqCst)
    }

    pub fn acquire_attempts(&self, model: &str) -> u32 {
        self.state
            .acquire_attempts
            .lock()
            .get(model)
            .copied()
            .unwrap_or(0)
    }

    pub fn cleanup_calls(&self, model: &str) -> u32 {
        self.state
            .cleanup_calls
            .lock()
            .get(model)
            .copied()
            .unwrap_or(0)
    }

    /// Number of `score_batch` calls across every scorer of this backend.
    pub fn score_calls(&self) -> usize {
        self.state.score_calls.load(Ordering::SeqCst)
    }

    /// `(query, passages)` exactly as each scoring call received them.
    pub fn scored_inputs(&self) -> Vec<(String, Vec<String>)> {
        self.state.scored_inputs.lock().clone()
    }

    /// A scorer for `model` that bypasses the lifecycle.
    pub fn scorer(&self, model: &str) -> Arc<dyn Scorer> {
        Arc::new(MockScorer {
            model_name: model.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    fn take_scripted_failure(&self, model: &str) -> bool {
        if self.state.unacquirable.lock().contains(model) {
            return true;
        }
        let mut failures = self.state.acquire_failures.lock();
        match failures.get_mut(model) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn device(&self) -> String {
        "mock".to_string()
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.state.pings.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .state
            .ping_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BackendError::Unreachable {
                endpoint: "mock".to_string(),
                reason: "scripted ping failure".to_string(),
            });
        }
        Ok(())
    }

    async fn has_model(&self, model: &str) -> Result<bool, BackendError> {
        Ok(self.is_present(model))
    }

    async fn acquire(&self, model: &str) -> Result<(), BackendError> {
        *self
            .state
            .acquire_attempts
            .lock()
            .entry(model.to_string())
            .or_insert(0) += 1;

        let hangs = self.state.hanging.lock().contains(model);
        if hangs {
            std::future::pending::<()>().await;
        }

        if self.take_scripted_failure(model) {
            return Err(BackendError::AcquisitionFailed {
                model: model.to_string(),
                reason: "scripted acquisition failure".to_string(),
            });
        }

        self.state.present.lock().insert(model.to_string());
        Ok(())
    }

    async fn cleanup(&self, model: &str) -> Result<(), BackendError> {
        *self
            .state
            .cleanup_calls
            .lock()
            .entry(model.to_string())
            .or_insert(0) += 1;
        Ok(())
    }

    async fn load(&self, model: &str) -> Result<Arc<dyn Scorer>, BackendError> {
        if self.state.unverifiable.lock().contains(model) {
            return Err(BackendError::ModelLoadFailed {
                reason: format!("scripted verification failure for {model}"),
            });
        }
        if !self.is_present(model) {
            return Err(BackendError::ModelNotFound {
                model: model.to_string(),
            });
        }
        Ok(self.scorer(model))
    }
}

/// Serving handle produced by [`MockBackend::load`].
pub struct MockScorer {
    model_name: String,
    state: Arc<MockState>,
}

#[async_trait]
impl Scorer for MockScorer {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn max_input_chars(&self) -> Option<usize> {
        *self.state.max_input_chars.lock()
    }

    async fn score_batch(
        &self,
        query: &str,
        passages: &[String],
    ) -> Result<Vec<f32>, BackendError> {
        self.state.score_calls.fetch_add(1, Ordering::SeqCst);
        self.state
            .scored_inputs
            .lock()
            .push((query.to_string(), passages.to_vec()));

        let delay = *self.state.scorer_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let score_fn = self.state.score_fn.lock().clone();
        let mut scores: Vec<f32> = passages
            .iter()
            .map(|p| match &score_fn {
                Some(f) => f(query, p),
                None => placeholder_score(query, p),
            })
            .collect();

        if self.state.short_output.load(Ordering::SeqCst) {
            scores.pop();
        }
        Ok(scores)
    }
}
