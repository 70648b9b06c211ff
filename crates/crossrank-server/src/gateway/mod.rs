//! HTTP gateway (Axum) for pair, batch and query reranking.
//!
//! This module is primarily used by the `crossrank` server binary.

pub mod error;
pub mod handler;
pub mod payload;
pub mod state;


use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use error::GatewayError;
pub use handler::{rerank_batch_handler, rerank_handler, rerank_query_handler};
pub use payload::HealthResponse;
pub use state::HandlerState;

use crossrank::{API_VERSION, CorsOrigins, SERVICE_NAME};

pub const STATUS_HEADER: &str = "x-crossrank-status";
pub const STATUS_HEALTHY: &str = "healthy";
pub const STATUS_UNHEALTHY: &str = "unhealthy";
pub const STATUS_NOT_READY: &str = "not_ready";
pub const STATUS_INVALID_REQUEST: &str = "invalid_request";
pub const STATUS_TIMEOUT: &str = "timeout";
pub const STATUS_ERROR: &str = "error";

pub fn create_router_with_state(state: HandlerState, cors: &CorsOrigins) -> Router {
    Router::new()
        .route("/", get(info_handler))
        .route("/health", get(health_handler))
        .route("/rerank", post(rerank_handler))
        .route("/rerank/batch", post(rerank_batch_handler))
        .route("/rerank/query", post(rerank_query_handler))
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origins. Credentials are never allowed.
pub fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::any(),
        CorsOrigins::List(list) => AllowOrigin::list(list.iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| warn!(origin = %origin, "Ignoring invalid CORS origin"))
                .ok()
        })),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

#[tracing::instrument(skip(state))]
pub async fn health_handler(State(state): State<HandlerState>) -> Response {
    let readiness = state.gate().snapshot();
    let ready = readiness.state.is_ready();

    let (status_code, label) = if ready {
        (StatusCode::OK, STATUS_HEALTHY)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, STATUS_UNHEALTHY)
    };

    let mut headers = HeaderMap::new();
    headers.insert(STATUS_HEADER, HeaderValue::from_static(label));

    let body = HealthResponse {
        status: label.to_string(),
        model_loaded: ready,
        model_name: readiness.reported_model().to_string(),
        device: state.device.clone(),
        version: API_VERSION.to_string(),
        state: readiness.state,
        fallback_active: readiness.via_fallback,
        detail: readiness.last_error.clone(),
    };

    (status_code, headers, Json(body)).into_response()
}

#[tracing::instrument(skip(state))]
pub async fn info_handler(State(state): State<HandlerState>) -> Json<serde_json::Value> {
    let readiness = state.gate().snapshot();

    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "model": readiness.reported_model(),
        "version": API_VERSION,
        "backend": state.backend_kind.as_str(),
        "endpoints": {
            "/": "Service information",
            "/health": "Health check endpoint",
            "/rerank": "Single text pair reranking",
            "/rerank/batch": "Batch text pairs reranking",
            "/rerank/query": "Query-based passage reranking (sorted by relevance)"
        }
    }))
}
