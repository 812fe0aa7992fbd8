//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// `/analyze` received zero events.
    #[error("No events provided")]
    EmptyAnalysis,
    /// `/time-patterns` received zero events.
    #[error("No events provided")]
    EmptyTimePatterns,
    /// The body exceeded the configured `max_body_bytes`.
    #[error("Request body too large")]
    PayloadTooLarge,
    /// The request could not be processed at all (e.g. malformed JSON).
    #[error("Failed to analyze events")]
    Processing(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            ApiError::EmptyAnalysis => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": message, "patterns": [], "trends": [] })),
            )
                .into_response(),
            ApiError::EmptyTimePatterns => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": message, "patterns": [] })),
            )
                .into_response(),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "message": message })),
            )
                .into_response(),
            ApiError::Processing(detail) => {
                tracing::warn!(error = %detail, "request processing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": message })),
                )
                    .into_response()
            }
        }
    }
}
