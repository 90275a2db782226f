//! # Data Transfer Objects
//!
//! Request and response bodies of the HTTP boundary.

use serde::{Deserialize, Serialize};
use validator::Validate;

// =====================================
// Single shorten
// =====================================
/// `POST /api/shorten` body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShortenRequest {
    #[validate(length(min = 1, message = "URL must not be empty"))]
    pub url: String,
}

/// `POST /api/shorten` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub result: String,
}

// =====================================
// Batch shorten
// =====================================
/// One item of `POST /api/shorten/batch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub correlation_id: String,
    pub original_url: String,
}

impl BatchItem {
    pub fn new(correlation_id: impl Into<String>, original_url: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            original_url: original_url.into(),
        }
    }
}

/// Batch result item, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub correlation_id: String,
    pub short_url: String,
}

// =====================================
// Owner listing
// =====================================
/// `GET /api/user/urls` item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedUrl {
    pub short_url: String,
    pub original_url: String,
}

// =====================================
// Health Check
// =====================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: String,
}

impl HealthResponse {
    #[must_use]
    pub fn healthy(storage: &str) -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            storage: storage.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_shorten_request_fails_validation() {
        let request = ShortenRequest { url: String::new() };
        assert!(request.validate().is_err());

        let request = ShortenRequest {
            url: "https://example.com".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_batch_item_wire_names() {
        let items: Vec<BatchItem> = serde_json::from_str(
            r#"[{"correlation_id":"1","original_url":"https://a.example"}]"#,
        )
        .unwrap();
        assert_eq!(items, vec![BatchItem::new("1", "https://a.example")]);
    }
}
