//! # Middleware
//!
//! - `identify`: resolves (or issues) the anonymous owner of every request
//! - `request_timing`: one log line per request with its duration
//! - `require_text_body`: 415 for `POST /` bodies that are not text or gzip

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{HeaderValue, CONTENT_TYPE, COOKIE, SET_COOKIE},
        HeaderMap, Request,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use super::extractors::Owner;
use crate::{error::AppError, services::AppState};

/// Cookie carrying the owner token.
pub const TOKEN_COOKIE: &str = "token";

/// Media types the plain-text shorten route accepts.
pub const TEXT_BODY_TYPES: &[&str] = &["text/plain", "text/html", "application/x-gzip"];

// =====================================
// Request Timing Middleware
// =====================================
/// ```rust,ignore
/// let app = Router::new()
///     .layer(axum::middleware::from_fn(request_timing));
/// ```
pub async fn request_timing(request: Request<Body>, next: Next) -> impl IntoResponse {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        "Request completed"
    );

    response
}

// =====================================
// Owner identification
// =====================================
/// Attach the request's [`Owner`].
///
/// A valid `token` cookie yields its owner. Without the cookie a new owner
/// is created and its token set on the response. A cookie that fails
/// verification is rejected with 401.
pub async fn identify(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (owner, issued) = match cookie_value(request.headers(), TOKEN_COOKIE) {
        Some(token) => (state.auth_service.verify(token)?.user_id, None),
        None => {
            let (owner, token) = state.auth_service.new_owner()?;
            (owner, Some(token))
        }
    };

    request.extensions_mut().insert(Owner(owner));
    let mut response = next.run(request).await;

    if let Some(token) = issued {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=None", TOKEN_COOKIE, token);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "Owner token is not a valid header value"),
        }
    }

    Ok(response)
}

// =====================================
// Content type guard
// =====================================
/// Reject requests whose `Content-Type` is missing or not in [`TEXT_BODY_TYPES`].
pub async fn require_text_body(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    match media_type(request.headers()) {
        Some(media) if TEXT_BODY_TYPES.contains(&media.as_str()) => Ok(next.run(request).await),
        media => Err(AppError::UnsupportedMediaType(format!(
            "expected one of {}, got '{}'",
            TEXT_BODY_TYPES.join(", "),
            media.unwrap_or_default()
        ))),
    }
}

/// `Content-Type` without parameters, lowercased.
fn media_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|media| media.trim().to_ascii_lowercase())
}

/// Value of cookie `name` across all `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
