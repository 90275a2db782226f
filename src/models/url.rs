//! # URL records
//!
//! The stored entity, the insert DTO, and the outcome types of the two
//! create paths.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// =====================================
// URL Entity
// =====================================
/// One stored mapping from short code to original URL.
///
/// Field names on the wire (JSON lines of the file backend, SQL columns,
/// API responses) follow the storage schema: `uuid`, `user_id`,
/// `short_url`, `original_url`, `is_deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UrlRecord {
    /// Sequence id assigned by the backend at write time
    #[serde(rename = "uuid")]
    #[sqlx(rename = "uuid")]
    pub id: i64,

    /// Opaque owner identifier
    pub user_id: String,

    #[serde(rename = "short_url")]
    #[sqlx(rename = "short_url")]
    pub short_code: String,

    pub original_url: String,

    /// Tombstone flag; records are never physically removed
    #[serde(default)]
    pub is_deleted: bool,
}

impl UrlRecord {
    /// Build the stored form of `new` under sequence id `id`.
    #[must_use]
    pub fn from_new(id: i64, new: &NewUrl) -> Self {
        Self {
            id,
            user_id: new.user_id.clone(),
            short_code: new.short_code.clone(),
            original_url: new.original_url.clone(),
            is_deleted: false,
        }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.is_deleted
    }
}

// =====================================
// Create URL DTO
// =====================================
/// Data for inserting a record; the id is the backend's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUrl {
    pub user_id: String,
    pub short_code: String,
    pub original_url: String,
}

impl NewUrl {
    /// Derive the short code from `original_url`.
    #[must_use]
    pub fn new(user_id: impl Into<String>, original_url: impl Into<String>) -> Self {
        let original_url = original_url.into();
        Self {
            user_id: user_id.into(),
            short_code: crate::utils::generate_short_code(&original_url),
            original_url,
        }
    }
}

// =====================================
// Create outcomes
// =====================================
/// Result of `StorageBackend::save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Saved {
    /// A new record was written with this code
    Created(String),
    /// The original URL already had a live record; this is its code
    AlreadyExists(String),
}

/// Result of shortening one URL: a usable absolute short URL either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortened {
    Created(String),
    AlreadyExists(String),
}

impl Shortened {
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Created(url) | Self::AlreadyExists(url) => url,
        }
    }

    #[must_use]
    pub fn into_url(self) -> String {
        match self {
            Self::Created(url) | Self::AlreadyExists(url) => url,
        }
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

// =====================================
// Deletion
// =====================================
/// A caller's request to soft-delete some of their codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub user_id: String,
    pub urls: Vec<String>,
}

impl DeleteRequest {
    pub fn new(user_id: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            user_id: user_id.into(),
            urls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_url_derives_code() {
        let new = NewUrl::new("user-1", "https://example.com");
        assert_eq!(new.short_code, "20381BAK");
    }

    #[test]
    fn test_record_json_line_format() {
        let record = UrlRecord::from_new(7, &NewUrl::new("u", "https://example.com"));
        let line = serde_json::to_string(&record).unwrap();
        assert_eq!(
            line,
            r#"{"uuid":7,"user_id":"u","short_url":"20381BAK","original_url":"https://example.com","is_deleted":false}"#
        );
    }

    #[test]
    fn test_missing_deleted_flag_defaults_to_live() {
        let record: UrlRecord = serde_json::from_str(
            r#"{"uuid":1,"user_id":"u","short_url":"X","original_url":"https://a.b"}"#,
        )
        .unwrap();
        assert!(record.is_live());
    }

    #[test]
    fn test_shortened_accessors() {
        let created = Shortened::Created("http://h/a".to_string());
        let existing = Shortened::AlreadyExists("http://h/a".to_string());
        assert_eq!(created.url(), existing.url());
        assert!(!created.is_conflict());
        assert!(existing.is_conflict());
    }
}
