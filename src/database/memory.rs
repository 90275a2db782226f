//! In-memory backend. Everything lives in one `Vec` behind one lock.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::repository::{
    check_batch, deletable, find_by_code, find_live_by_original, into_lookup, StorageBackend,
};
use crate::error::{AppError, Result};
use crate::models::{NewUrl, Saved, UrlRecord};

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<UrlRecord>,
    last_id: i64,
}

impl MemoryState {
    fn insert(&mut self, new: &NewUrl) {
        self.last_id += 1;
        self.records.push(UrlRecord::from_new(self.last_id, new));
    }
}

/// Process-local storage; contents are lost on restart.
///
/// Every operation holds the single lock for its whole duration, so reads
/// queue behind writes.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryRepository {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        Err(AppError::unsupported(self.kind(), "ping"))
    }

    async fn save(&self, record: &NewUrl) -> Result<Saved> {
        let mut state = self.state.lock().await;

        if let Some(existing) = find_live_by_original(&state.records, &record.original_url) {
            return Ok(Saved::AlreadyExists(existing.short_code.clone()));
        }

        state.insert(record);
        Ok(Saved::Created(record.short_code.clone()))
    }

    async fn save_all(&self, records: &[NewUrl]) -> Result<()> {
        let mut state = self.state.lock().await;

        check_batch(&state.records, records)?;
        for record in records {
            state.insert(record);
        }

        Ok(())
    }

    async fn get(&self, short_code: &str) -> Result<UrlRecord> {
        let state = self.state.lock().await;
        into_lookup(find_by_code(&state.records, short_code), short_code)
    }

    async fn get_by_id(&self, id: i64) -> Result<UrlRecord> {
        let state = self.state.lock().await;
        let found = state.records.iter().find(|r| r.id == id).cloned();
        into_lookup(found, id)
    }

    async fn get_all_by_user(&self, user_id: &str) -> Result<Vec<UrlRecord>> {
        let state = self.state.lock().await;

        Ok(state
            .records
            .iter()
            .filter(|r| r.is_live() && r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_batch(&self, user_id: &str, short_codes: &[String]) -> Result<()> {
        if short_codes.is_empty() {
            return Ok(());
        }

        let mut state = self.state.lock().await;
        for record in deletable(&mut state.records, user_id, short_codes) {
            record.is_deleted = true;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let repo = MemoryRepository::new();
        repo.save(&NewUrl::new("u", "https://a.example")).await.unwrap();
        repo.save(&NewUrl::new("u", "https://b.example")).await.unwrap();

        let b = repo.get_by_id(2).await.unwrap();
        assert_eq!(b.original_url, "https://b.example");
    }

    #[tokio::test]
    async fn test_ping_is_unsupported() {
        let repo = MemoryRepository::new();
        assert!(matches!(repo.ping().await, Err(AppError::Unsupported(_))));
    }
}
