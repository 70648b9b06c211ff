//! Wire shapes of the HTTP API.

use serde::{Deserialize, Serialize};

use crossrank::{BackendState, RerankPair, RerankedItem};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankRequestBody {
    pub query: String,
    pub passage: String,
    #[serde(default)]
    pub normalize: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankResponseBody {
    pub score: f64,
    pub normalized: bool,
    pub query_length: usize,
    pub passage_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequestBody {
    pub pairs: Vec<RerankPair>,
    #[serde(default)]
    pub normalize: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponseBody {
    pub scores: Vec<f64>,
    pub normalized: bool,
    pub pairs_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequestBody {
    pub query: String,
    pub passages: Vec<String>,
    #[serde(default)]
    pub normalize: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponseBody {
    pub re_ranked: Vec<RerankedItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_name: String,
    pub device: String,
    pub version: String,
    pub state: BackendState,
    pub fallback_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
