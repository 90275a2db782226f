//! # Storage contract
//!
//! `StorageBackend` is the one capability every backend implements. The
//! service layer only ever holds an `Arc<dyn StorageBackend>`, chosen once at
//! startup by `database::open`.
//!
//! Contract shared by all implementations:
//! - at most one live (non-deleted) record per original URL
//! - `get`/`get_by_id` tell "never existed" (`NotFound`) apart from
//!   "tombstoned" (`Gone`)
//! - `delete_batch` only touches live records of the given owner and treats
//!   unknown codes as a no-op
//! - `save_all` is all-or-nothing

use std::collections::HashSet;
use std::fmt::Display;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{NewUrl, Saved, UrlRecord};

// =====================================
// Storage Backend Trait
// =====================================
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name for logs ("memory", "file", "sqlite").
    fn kind(&self) -> &'static str;

    /// Liveness of the underlying store.
    ///
    /// Backends without a remote store return `AppError::Unsupported`.
    async fn ping(&self) -> Result<()>;

    /// Insert one record, or report the live code of an equal original URL.
    async fn save(&self, record: &NewUrl) -> Result<Saved>;

    /// Insert every record or none of them.
    ///
    /// Any duplicate original URL, against stored live records or inside
    /// `records` itself, fails the call with `AppError::Conflict`.
    async fn save_all(&self, records: &[NewUrl]) -> Result<()>;

    /// Look up by short code. A live record wins over tombstones with the
    /// same code.
    async fn get(&self, short_code: &str) -> Result<UrlRecord>;

    /// Look up by sequence id.
    async fn get_by_id(&self, id: i64) -> Result<UrlRecord>;

    /// Live records of `user_id`, oldest first.
    async fn get_all_by_user(&self, user_id: &str) -> Result<Vec<UrlRecord>>;

    /// Tombstone the live records of `user_id` whose code is in `short_codes`.
    async fn delete_batch(&self, user_id: &str, short_codes: &[String]) -> Result<()>;
}

// =====================================
// Shared lookup helpers
// =====================================
// Used by the backends that keep records as a plain sequence (memory, file).

/// Turn an optional hit into the NotFound/Gone/Ok contract.
pub(crate) fn into_lookup(found: Option<UrlRecord>, key: impl Display) -> Result<UrlRecord> {
    match found {
        None => Err(AppError::url_not_found(key)),
        Some(record) if record.is_deleted => Err(AppError::url_deleted(key)),
        Some(record) => Ok(record),
    }
}

/// Best record for `short_code`: the live one if any, else the newest tombstone.
pub(crate) fn find_by_code(records: &[UrlRecord], short_code: &str) -> Option<UrlRecord> {
    let mut tombstone = None;

    for record in records.iter().rev().filter(|r| r.short_code == short_code) {
        if record.is_live() {
            return Some(record.clone());
        }
        tombstone.get_or_insert(record);
    }

    tombstone.cloned()
}

pub(crate) fn find_live_by_original<'a>(
    records: &'a [UrlRecord],
    original_url: &str,
) -> Option<&'a UrlRecord> {
    records
        .iter()
        .find(|r| r.is_live() && r.original_url == original_url)
}

/// Reject a batch that would put a second live record on any original URL.
pub(crate) fn check_batch(records: &[UrlRecord], batch: &[NewUrl]) -> Result<()> {
    let mut seen = HashSet::with_capacity(batch.len());

    for new in batch {
        if !seen.insert(new.original_url.as_str())
            || find_live_by_original(records, &new.original_url).is_some()
        {
            return Err(AppError::Conflict(format!(
                "URL '{}' already exists",
                new.original_url
            )));
        }
    }

    Ok(())
}

/// Live records of `user_id` matching `short_codes`, as mutable references.
pub(crate) fn deletable<'a>(
    records: &'a mut [UrlRecord],
    user_id: &'a str,
    short_codes: &'a [String],
) -> impl Iterator<Item = &'a mut UrlRecord> + 'a {
    let codes: HashSet<&str> = short_codes.iter().map(String::as_str).collect();

    records.iter_mut().filter(move |r| {
        r.is_live() && r.user_id == user_id && codes.contains(r.short_code.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, code: &str, deleted: bool) -> UrlRecord {
        UrlRecord {
            id,
            user_id: "u".to_string(),
            short_code: code.to_string(),
            original_url: format!("https://{}.example", code),
            is_deleted: deleted,
        }
    }

    #[test]
    fn test_live_record_wins_over_tombstone() {
        let records = vec![record(1, "A", true), record(2, "A", false), record(3, "B", true)];

        assert_eq!(find_by_code(&records, "A").map(|r| r.id), Some(2));
        assert_eq!(find_by_code(&records, "B").map(|r| r.id), Some(3));
        assert_eq!(find_by_code(&records, "C"), None);
    }

    #[test]
    fn test_into_lookup_distinguishes_tombstones() {
        assert!(matches!(into_lookup(None, "X"), Err(AppError::NotFound(_))));
        assert!(matches!(
            into_lookup(Some(record(1, "X", true)), "X"),
            Err(AppError::Gone(_))
        ));
        assert!(into_lookup(Some(record(1, "X", false)), "X").is_ok());
    }

    #[test]
    fn test_check_batch_rejects_inner_duplicates() {
        let batch = vec![
            NewUrl::new("u", "https://a.example"),
            NewUrl::new("u", "https://a.example"),
        ];
        assert!(matches!(check_batch(&[], &batch), Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_check_batch_ignores_tombstones() {
        let stored = vec![record(1, "A", true)];
        let batch = vec![NewUrl::new("u", "https://A.example")];
        assert!(check_batch(&stored, &batch).is_ok());
    }
}
