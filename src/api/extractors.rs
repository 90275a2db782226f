//! # Custom Extractors
//!
//! - [`Owner`]: owner id resolved by the `identify` middleware
//! - [`RequestScheme`]: scheme the client used, for composing short URLs
//! - [`ValidatedJson`] / [`JsonBody`]: JSON bodies; 415 without a JSON
//!   content type, 400 on malformed input

use axum::{
    async_trait,
    body::Body,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts},
    http::{request::Parts, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{error::AppError, utils::DEFAULT_SCHEME};

// =====================================
// Owner Extractor
// =====================================
/// Owner id of the current request.
///
/// `identify` stores it in the request extensions; a route not behind that
/// middleware gets 401.
///
/// ```rust,ignore
/// async fn handler(Owner(user_id): Owner) -> ... { }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Owner>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Unknown owner".to_string()))
    }
}

// =====================================
// Request Scheme Extractor
// =====================================
/// `http` or `https`, taken from `X-Forwarded-Proto` when a proxy sets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestScheme(pub String);

impl RequestScheme {
    pub const HEADER_NAME: &'static str = "X-Forwarded-Proto";
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestScheme {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let scheme = parts
            .headers
            .get(Self::HEADER_NAME)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| s == "http" || s == "https")
            .unwrap_or_else(|| DEFAULT_SCHEME.to_string());

        Ok(RequestScheme(scheme))
    }
}

// =====================================
// JSON bodies
// =====================================
/// JSON body in the service's error format: 415 when the content type is
/// not JSON, 400 when the body is malformed.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data): Json<T> = Json::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| match e {
                JsonRejection::MissingJsonContentType(e) => {
                    AppError::UnsupportedMediaType(e.body_text())
                }
                e => AppError::BadRequest(format!("Invalid JSON: {}", e)),
            })?;

        Ok(JsonBody(data))
    }
}

/// JSON body that must also pass its `validator` rules (422 otherwise).
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(data) = JsonBody::<T>::from_request(req, state).await?;
        data.validate()?;

        Ok(ValidatedJson(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scheme_of(header: Option<&str>) -> String {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(RequestScheme::HEADER_NAME, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();

        RequestScheme::from_request_parts(&mut parts, &())
            .await
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn test_scheme_defaults_to_http() {
        assert_eq!(scheme_of(None).await, "http");
        assert_eq!(scheme_of(Some("gopher")).await, "http");
    }

    #[tokio::test]
    async fn test_scheme_from_forwarded_proto() {
        assert_eq!(scheme_of(Some("HTTPS")).await, "https");
        assert_eq!(scheme_of(Some("https, http")).await, "https");
    }

    #[tokio::test]
    async fn test_owner_missing_is_unauthorized() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        assert!(matches!(
            Owner::from_request_parts(&mut parts, &()).await,
            Err(AppError::Unauthorized(_))
        ));

        parts.extensions.insert(Owner("u1".to_string()));
        assert_eq!(
            Owner::from_request_parts(&mut parts, &()).await.unwrap(),
            Owner("u1".to_string())
        );
    }
}
