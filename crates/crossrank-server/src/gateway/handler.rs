use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crossrank::{BatchRequest, QueryRequest, RerankPair};

use crate::gateway::error::GatewayError;
use crate::gateway::payload::{
    BatchRequestBody, BatchResponseBody, QueryRequestBody, QueryResponseBody, RerankRequestBody,
    RerankResponseBody,
};
use crate::gateway::state::HandlerState;

/// Unwraps a JSON body, turning malformed or mistyped payloads into a 422.
pub fn parse_body<T: DeserializeOwned>(
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<T, GatewayError> {
    let Json(value) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    serde_json::from_value(value)
        .map_err(|e| GatewayError::InvalidRequest(format!("Invalid request schema: {e}")))
}

#[instrument(skip_all)]
pub async fn rerank_handler(
    State(state): State<HandlerState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<RerankResponseBody>, GatewayError> {
    let body: RerankRequestBody = parse_body(payload)?;
    let normalize = state.normalize(body.normalize);
    let pair = RerankPair::new(body.query, body.passage);

    let score = state.service.score_pair(&pair, normalize).await?;
    debug!(score, normalize, "Scored pair");

    Ok(Json(RerankResponseBody {
        score,
        normalized: normalize,
        query_length: pair.query.chars().count(),
        passage_length: pair.passage.chars().count(),
    }))
}

#[instrument(skip_all)]
pub async fn rerank_batch_handler(
    State(state): State<HandlerState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<BatchResponseBody>, GatewayError> {
    let body: BatchRequestBody = parse_body(payload)?;
    let request = BatchRequest {
        normalize: state.normalize(body.normalize),
        pairs: body.pairs,
    };

    let result = state.service.score_batch(&request).await?;

    Ok(Json(BatchResponseBody {
        pairs_count: result.scores.len(),
        scores: result.scores,
        normalized: result.normalized,
    }))
}

#[instrument(skip_all)]
pub async fn rerank_query_handler(
    State(state): State<HandlerState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<QueryResponseBody>, GatewayError> {
    let body: QueryRequestBody = parse_body(payload)?;
    let request = QueryRequest {
        normalize: state.normalize(body.normalize),
        query: body.query,
        passages: body.passages,
    };

    let re_ranked = state.service.rerank_query(&request).await?;

    Ok(Json(QueryResponseBody { re_ranked }))
}
