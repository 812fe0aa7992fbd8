//! API route definitions.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;
use crate::model::{AnalysisResult, AnalyzeRequest};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/time-patterns", post(time_patterns))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// The body is parsed by hand so malformed JSON maps to the 500 failure
/// body instead of axum's extractor rejection.
fn parse_request(body: Result<Bytes, BytesRejection>) -> Result<AnalyzeRequest, ApiError> {
    let body = body.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge,
        _ => ApiError::Processing(rejection.body_text()),
    })?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Processing(e.to_string()))
}

async fn analyze(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let request_id = Uuid::new_v4();
    let _span = tracing::info_span!("analyze", %request_id).entered();

    let request = parse_request(body)?;
    let events = match request.events {
        Some(events) if !events.is_empty() => events,
        _ => return Err(ApiError::EmptyAnalysis),
    };
    let filters = request.filters.unwrap_or_default();

    let result = state.service.analyze(&events, &filters);
    info!(
        events = events.len(),
        depot = ?filters.depot(),
        driver = ?filters.driver(),
        patterns = result.patterns.len(),
        trends = result.trends.len(),
        "analysis served"
    );
    Ok(Json(result))
}

async fn time_patterns(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = parse_request(body)?;
    let events = match request.events {
        Some(events) if !events.is_empty() => events,
        _ => return Err(ApiError::EmptyTimePatterns),
    };
    let filters = request.filters.unwrap_or_default();

    let patterns = state.service.time_patterns(&events, &filters);
    Ok(Json(json!({ "patterns": patterns })))
}
