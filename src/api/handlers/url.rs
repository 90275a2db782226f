//! # URL Handlers
//!
//! Create, batch-create, redirect and lookup-by-id.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use tracing::info;

use crate::{
    api::extractors::{JsonBody, Owner, RequestScheme, ValidatedJson},
    error::{AppError, Result},
    models::{BatchItem, Shortened, ShortenRequest, ShortenResponse, UrlRecord},
    services::AppState,
};

/// 201 for a new record, 409 when the URL was already shortened.
fn status_of(shortened: &Shortened) -> StatusCode {
    if shortened.is_conflict() {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    }
}

// =====================================
// Shorten (plain text)
// =====================================
/// `POST /`
///
/// Body is the original URL as text; the response body is the short URL.
pub async fn shorten_text(
    State(state): State<AppState>,
    Owner(owner): Owner,
    RequestScheme(scheme): RequestScheme,
    body: String,
) -> Result<Response> {
    let original = body.trim();
    if original.is_empty() {
        return Err(AppError::BadRequest("Request body is empty".to_string()));
    }

    let shortened = state.url_service.shorten(&scheme, &owner, original).await?;
    let status = status_of(&shortened);

    Ok((
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        shortened.into_url(),
    )
        .into_response())
}

// =====================================
// Shorten (JSON)
// =====================================
/// `POST /api/shorten`
///
/// ```json
/// {"url": "https://example.com"}  ->  {"result": "http://localhost:8080/20381BAK"}
/// ```
pub async fn shorten_json(
    State(state): State<AppState>,
    Owner(owner): Owner,
    RequestScheme(scheme): RequestScheme,
    ValidatedJson(request): ValidatedJson<ShortenRequest>,
) -> Result<Response> {
    let shortened = state
        .url_service
        .shorten(&scheme, &owner, &request.url)
        .await?;
    let status = status_of(&shortened);

    Ok((
        status,
        Json(ShortenResponse {
            result: shortened.into_url(),
        }),
    )
        .into_response())
}

// =====================================
// Shorten batch
// =====================================
/// `POST /api/shorten/batch`
///
/// All items are stored or none; results follow the input order.
pub async fn shorten_batch(
    State(state): State<AppState>,
    Owner(owner): Owner,
    RequestScheme(scheme): RequestScheme,
    JsonBody(items): JsonBody<Vec<BatchItem>>,
) -> Result<impl IntoResponse> {
    let results = state
        .url_service
        .shorten_batch(&scheme, &owner, items)
        .await?;

    Ok((StatusCode::CREATED, Json(results)))
}

// =====================================
// Redirect
// =====================================
/// `GET /:code`
///
/// 307 to the original URL; 404 for an unknown code, 410 for a deleted one.
pub async fn redirect(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Redirect> {
    let original_url = state.url_service.resolve(&code).await?;
    info!(short_code = %code, "Redirecting");

    Ok(Redirect::temporary(&original_url))
}

// =====================================
// Lookup by id
// =====================================
/// `GET /api/urls/:id`
pub async fn url_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UrlRecord>> {
    Ok(Json(state.url_service.url_by_id(id).await?))
}
