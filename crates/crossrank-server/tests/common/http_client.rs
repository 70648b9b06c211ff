//! HTTP client helpers for tests.

#![allow(dead_code)]

use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
const STATUS_HEADER: &str = "x-crossrank-status";

pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, TestClientError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let resp = self.client.post(self.url(path)).json(body).send().await?;

        match resp.status().as_u16() {
            200 => Ok(resp.json().await?),
            status => {
                let label = resp
                    .headers()
                    .get(STATUS_HEADER)
                    .and_then(|h| h.to_str().ok())
                    .unwrap_or("unknown")
                    .to_string();
                let body = resp.text().await.unwrap_or_default();
                Err(TestClientError::UnexpectedStatus(status, label, body))
            }
        }
    }

    pub async fn rerank(
        &self,
        query: &str,
        passage: &str,
        normalize: Option<bool>,
    ) -> Result<RerankResponse, TestClientError> {
        let body = serde_json::json!({"query": query, "passage": passage, "normalize": normalize});
        self.post("/rerank", &body).await
    }

    pub async fn rerank_batch(
        &self,
        pairs: &[(&str, &str)],
        normalize: Option<bool>,
    ) -> Result<BatchResponse, TestClientError> {
        let pairs: Vec<_> = pairs
            .iter()
            .map(|(q, p)| serde_json::json!({"query": q, "passage": p}))
            .collect();
        let body = serde_json::json!({"pairs": pairs, "normalize": normalize});
        self.post("/rerank/batch", &body).await
    }

    pub async fn rerank_query(
        &self,
        query: &str,
        passages: &[&str],
        normalize: Option<bool>,
    ) -> Result<QueryResponse, TestClientError> {
        let body = serde_json::json!({"query": query, "passages": passages, "normalize": normalize});
        self.post("/rerank/query", &body).await
    }

    /// Health body and status code; `/health` answers 503 with a body while not ready.
    pub async fn health(&self) -> Result<(u16, HealthResponse), TestClientError> {
        let resp = self.client.get(self.url("/health")).send().await?;
        let status = resp.status().as_u16();
        Ok((status, resp.json().await?))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RerankResponse {
    pub score: f64,
    pub normalized: bool,
    pub query_length: usize,
    pub passage_length: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchResponse {
    pub scores: Vec<f64>,
    pub normalized: bool,
    pub pairs_count: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RankedPassage {
    pub passage: String,
    pub score: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryResponse {
    pub re_ranked: Vec<RankedPassage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_name: String,
    pub device: String,
    pub version: String,
    pub state: String,
    pub fallback_active: bool,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TestClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0} ({1}) - Body: {2}")]
    UnexpectedStatus(u16, String, String),
}

impl TestClientError {
    pub fn status(&self) -> Option<(u16, &str)> {
        match self {
            TestClientError::UnexpectedStatus(code, label, _) => Some((*code, label.as_str())),
            TestClientError::RequestFailed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_url_building() {
        let client = TestClient::new("http://localhost:8000");
        assert_eq!(client.url("/health"), "http://localhost:8000/health");
        assert_eq!(client.url("health"), "http://localhost:8000/health");
    }
}
