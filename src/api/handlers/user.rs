//! # Owner Handlers
//!
//! Listing and deleting the caller's own URLs.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    api::extractors::{JsonBody, Owner},
    error::Result,
    models::DeleteRequest,
    services::AppState,
};

/// `GET /api/user/urls`
///
/// 204 when the owner has nothing live.
pub async fn list_urls(State(state): State<AppState>, Owner(owner): Owner) -> Result<Response> {
    let urls = state.url_service.list_owned(&owner).await?;

    if urls.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(urls).into_response())
}

/// `DELETE /api/user/urls`
///
/// Body is a JSON array of short codes. Answers 202 once queued; the
/// deletion itself happens in the background.
pub async fn delete_urls(
    State(state): State<AppState>,
    Owner(owner): Owner,
    JsonBody(codes): JsonBody<Vec<String>>,
) -> StatusCode {
    state
        .url_service
        .enqueue_delete(DeleteRequest::new(owner, codes))
        .await;

    StatusCode::ACCEPTED
}
