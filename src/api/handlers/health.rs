//! # Health Handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::{error::Result, models::HealthResponse, services::AppState};

/// `GET /ping`
///
/// 200 when the backend answers, 501 for backends that cannot be pinged,
/// 500 when the ping fails.
pub async fn ping(State(state): State<AppState>) -> Result<StatusCode> {
    state.url_service.ping().await?;
    Ok(StatusCode::OK)
}

/// `GET /health`
///
/// Process liveness, independent of the backend.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.url_service.storage_kind()))
}
