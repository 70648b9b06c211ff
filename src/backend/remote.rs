//! Remote inference service backend.
//!
//! Lifecycle calls use the service's model-management API
//! (`/api/version`, `/api/tags`, `/api/pull`, `/api/delete`); scoring uses
//! `POST /rerank`, which answers with `{index, score}` entries in any order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{BackendError, BackendKind, ModelBackend, Scorer};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    texts: &'a [String],
    raw_scores: bool,
}

#[derive(Debug, Deserialize)]
struct RankEntry {
    index: usize,
    score: f32,
}

/// Returns `true` if a listed tag names `model` (an implicit `:latest` tag matches).
fn tag_matches(tag: &str, model: &str) -> bool {
    tag == model || tag.strip_suffix(":latest") == Some(model)
}

/// Reorders `{index, score}` entries into passage order.
fn scores_in_passage_order(entries: Vec<RankEntry>, expected: usize) -> Result<Vec<f32>, BackendError> {
    if entries.len() != expected {
        return Err(BackendError::InvalidResponse {
            reason: format!("expected {expected} scores, got {}", entries.len()),
        });
    }

    let mut scores: Vec<Option<f32>> = vec![None; expected];
    for entry in entries {
        match scores.get_mut(entry.index) {
            Some(slot @ None) => *slot = Some(entry.score),
            Some(Some(_)) => {
                return Err(BackendError::InvalidResponse {
                    reason: format!("duplicate index {}", entry.index),
                });
            }
            None => {
                return Err(BackendError::InvalidResponse {
                    reason: format!("index {} out of range", entry.index),
                });
            }
        }
    }

    // Every slot is filled: `expected` distinct in-range indices were seen.
    Ok(scores.into_iter().flatten().collect())
}

#[derive(Clone)]
struct RemoteClient {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteClient {
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn check(&self, endpoint: String, resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(BackendError::Http {
            endpoint,
            status,
            body,
        })
    }

    fn unreachable(endpoint: &str, err: reqwest::Error) -> BackendError {
        BackendError::Unreachable {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        }
    }

    fn malformed(err: reqwest::Error) -> BackendError {
        BackendError::InvalidResponse {
            reason: err.to_string(),
        }
    }
}

/// Backend that delegates model management and scoring to an HTTP service.
pub struct RemoteBackend {
    http: RemoteClient,
    max_input_chars: usize,
}

impl std::fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBackend")
            .field("base_url", &self.http.base_url)
            .field("max_input_chars", &self.max_input_chars)
            .finish()
    }
}

impl RemoteBackend {
    /// Creates a backend for `base_url` (e.g. `http://localhost:11434`).
    pub fn new(base_url: &str, max_input_chars: usize) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RemoteClient::unreachable(base_url, e))?;

        Ok(Self {
            http: RemoteClient {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            },
            max_input_chars,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let endpoint = self.http.url("/api/tags");
        let resp = self
            .http
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| RemoteClient::unreachable(&endpoint, e))?;
        let tags: TagsResponse = self
            .http
            .check(endpoint, resp)
            .await?
            .json()
            .await
            .map_err(RemoteClient::malformed)?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl ModelBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn device(&self) -> String {
        BackendKind::Remote.as_str().to_string()
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let endpoint = self.http.url("/api/version");
        let resp = self
            .http
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| RemoteClient::unreachable(&endpoint, e))?;
        self.http.check(endpoint, resp).await?;
        Ok(())
    }

    async fn has_model(&self, model: &str) -> Result<bool, BackendError> {
        Ok(self
            .list_models()
            .await?
            .iter()
            .any(|tag| tag_matches(tag, model)))
    }

    async fn acquire(&self, model: &str) -> Result<(), BackendError> {
        let endpoint = self.http.url("/api/pull");
        info!(model, endpoint = %endpoint, "Pulling model");

        let resp = self
            .http
            .client
            .post(&endpoint)
            .json(&PullRequest {
                name: model,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| RemoteClient::unreachable(&endpoint, e))?;
        let pull: PullResponse = self
            .http
            .check(endpoint, resp)
            .await?
            .json()
            .await
            .map_err(RemoteClient::malformed)?;

        if pull.status != "success" {
            return Err(BackendError::AcquisitionFailed {
                model: model.to_string(),
                reason: format!("pull finished with status '{}'", pull.status),
            });
        }
        Ok(())
    }

    async fn cleanup(&self, model: &str) -> Result<(), BackendError> {
        let endpoint = self.http.url("/api/delete");
        let resp = self
            .http
            .client
            .delete(&endpoint)
            .json(&DeleteRequest { name: model })
            .send()
            .await
            .map_err(|e| RemoteClient::unreachable(&endpoint, e))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(model, "No partial model to clean up");
            return Ok(());
        }
        self.http.check(endpoint, resp).await?;
        Ok(())
    }

    async fn load(&self, model: &str) -> Result<Arc<dyn Scorer>, BackendError> {
        if !self.has_model(model).await? {
            return Err(BackendError::ModelNotFound {
                model: model.to_string(),
            });
        }

        Ok(Arc::new(RemoteScorer {
            http: self.http.clone(),
            model_name: model.to_string(),
            max_input_chars: self.max_input_chars,
        }))
    }
}

/// Serving handle for one model on the remote service. Safe to call concurrently.
pub struct RemoteScorer {
    http: RemoteClient,
    model_name: String,
    max_input_chars: usize,
}

#[async_trait]
impl Scorer for RemoteScorer {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn max_input_chars(&self) -> Option<usize> {
        Some(self.max_input_chars)
    }

    async fn score_batch(
        &self,
        query: &str,
        passages: &[String],
    ) -> Result<Vec<f32>, BackendError> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let endpoint = self.http.url("/rerank");
        let resp = self
            .http
            .client
            .post(&endpoint)
            .json(&RerankRequest {
                model: &self.model_name,
                query,
                texts: passages,
                raw_scores: true,
            })
            .send()
            .await
            .map_err(|e| RemoteClient::unreachable(&endpoint, e))?;
        let entries: Vec<RankEntry> = self
            .http
            .check(endpoint, resp)
            .await?
            .json()
            .await
            .map_err(RemoteClient::malformed)?;

        scores_in_passage_order(entries, passages.len())
    }
}
