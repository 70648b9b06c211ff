use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crossrank::{BackendError, ScoringError};

use super::{
    STATUS_ERROR, STATUS_HEADER, STATUS_INVALID_REQUEST, STATUS_NOT_READY, STATUS_TIMEOUT,
};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Scoring(#[from] ScoringError),
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl GatewayError {
    /// HTTP status and `x-crossrank-status` label for this error.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            GatewayError::InvalidRequest(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, STATUS_INVALID_REQUEST)
            }
            GatewayError::Scoring(e) => match e {
                ScoringError::Validation(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, STATUS_INVALID_REQUEST)
                }
                ScoringError::BackendUnavailable { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, STATUS_NOT_READY)
                }
                ScoringError::BackendTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, STATUS_TIMEOUT),
                ScoringError::Backend(
                    BackendError::Unreachable { .. } | BackendError::Http { .. },
                ) => (StatusCode::SERVICE_UNAVAILABLE, STATUS_ERROR),
                ScoringError::InternalScoring { .. } | ScoringError::Backend(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, STATUS_ERROR)
                }
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, label) = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let mut headers = HeaderMap::new();
        headers.insert(STATUS_HEADER, HeaderValue::from_static(label));

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}
