//! # Error handling
//!
//! One error enum for the whole crate. Storage backends, the URL service and
//! the HTTP layer all speak `AppError`, so `?` works across every layer and
//! the HTTP status is decided in exactly one place.
//!
//! Lookup outcomes are part of the taxonomy: `NotFound` (never existed) and
//! `Gone` (existed, now tombstoned) are distinct variants because callers
//! answer them differently.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

// =====================================
// Result Type Alias
// =====================================
/// Crate-wide result type.
pub type Result<T, E = AppError> = std::result::Result<T, E>;

// =====================================
// Custom Error Enum
// =====================================
/// Application error.
#[derive(Debug, Error)]
pub enum AppError {
    // ----------------------------------------
    // Client errors (4xx)
    // ----------------------------------------
    /// Malformed request - 400
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid owner token - 401
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Short code or id never existed - 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record existed but was soft-deleted - 410
    #[error("Gone: {0}")]
    Gone(String),

    /// Unique original URL violated inside a batch - 409
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request body in a media type the route does not take - 415
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Empty input rejected before reaching storage - 422
    #[error("Validation error: {0}")]
    Validation(String),

    // ----------------------------------------
    // Server errors (5xx)
    // ----------------------------------------
    /// A backend variant does not implement the operation - 501
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Internal server error - 500
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // ----------------------------------------
    // Library errors
    // ----------------------------------------
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Gone(_) => StatusCode::GONE,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,

            // 5xx Server Errors
            Self::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_)
            | Self::Config(_)
            | Self::Database(_)
            | Self::Migration(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Jwt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Lookup miss for a short code or id.
    #[must_use]
    pub fn url_not_found(key: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("URL '{}' not found", key))
    }

    /// Lookup hit on a tombstone.
    #[must_use]
    pub fn url_deleted(key: impl std::fmt::Display) -> Self {
        Self::Gone(format!("URL '{}' was deleted", key))
    }

    /// Capability gap of a storage variant.
    #[must_use]
    pub fn unsupported(backend: &str, operation: &str) -> Self {
        Self::Unsupported(format!("{} storage does not implement {}", backend, operation))
    }
}

// =====================================
// Error Response DTO
// =====================================
/// JSON body sent for every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Canonical reason, e.g. "Not Found"
    pub error: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status_code: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status_code = Some(status.as_u16());
        self
    }
}

// =====================================
// IntoResponse Implementation
// =====================================
/// Lets handlers return `Result<_, AppError>` directly.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            error!(error = %self, "Server error occurred");
        }

        let status = self.status_code();
        let body = ErrorResponse::new(
            status.canonical_reason().unwrap_or("Error"),
            self.to_string(),
        )
        .with_status(status);

        (status, Json(body)).into_response()
    }
}

// =====================================
// From Implementations
// =====================================

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
