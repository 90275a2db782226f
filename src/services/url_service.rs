//! # URL service
//!
//! Orchestrates code generation and storage for the create and read paths,
//! and hands delete requests to the [`DeletionCoalescer`].

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::DeletionCoalescer;
use crate::{
    config::Config,
    database::StorageBackend,
    error::{AppError, Result},
    models::{BatchItem, BatchResult, DeleteRequest, NewUrl, OwnedUrl, Saved, Shortened, UrlRecord},
    utils::{compose_short_url, DEFAULT_SCHEME},
};

// =====================================
// URL Service
// =====================================
pub struct UrlService {
    storage: Arc<dyn StorageBackend>,
    base_url: String,
    deletions: DeletionCoalescer,
}

impl fmt::Debug for UrlService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlService")
            .field("storage", &self.storage.kind())
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl UrlService {
    /// Build the service and start its deletion worker.
    ///
    /// Must be called from within a Tokio runtime. The worker stops when
    /// `cancel` fires or [`shutdown`](Self::shutdown) is called.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, config: &Config, cancel: CancellationToken) -> Self {
        let deletions = DeletionCoalescer::spawn(storage.clone(), config.deletion, cancel);

        Self {
            storage,
            base_url: config.base_url.clone(),
            deletions,
        }
    }

    /// Name of the storage backend in use.
    #[must_use]
    pub fn storage_kind(&self) -> &'static str {
        self.storage.kind()
    }

    /// Shorten one URL.
    ///
    /// Returns `Shortened::AlreadyExists` with the same short URL when the
    /// original URL is already stored.
    ///
    /// # Errors
    /// - `Validation`: empty `scheme` or `original`
    /// - storage failures
    #[instrument(skip(self))]
    pub async fn shorten(&self, scheme: &str, owner: &str, original: &str) -> Result<Shortened> {
        if scheme.is_empty() || original.is_empty() {
            return Err(AppError::Validation(
                "scheme and URL must not be empty".to_string(),
            ));
        }

        let record = NewUrl::new(owner, original);
        let shortened = match self.storage.save(&record).await? {
            Saved::Created(code) => {
                info!(short_code = %code, "Created new short URL");
                Shortened::Created(self.compose(scheme, &code))
            }
            Saved::AlreadyExists(code) => {
                debug!(short_code = %code, "URL already shortened");
                Shortened::AlreadyExists(self.compose(scheme, &code))
            }
        };

        Ok(shortened)
    }

    /// Shorten many URLs at once. Either every item is stored or none is.
    ///
    /// Results keep the input order.
    ///
    /// # Errors
    /// - `Validation`: empty `scheme` or any empty `original_url`
    /// - `Conflict`: an original URL is already stored or repeats in `items`
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn shorten_batch(
        &self,
        scheme: &str,
        owner: &str,
        items: Vec<BatchItem>,
    ) -> Result<Vec<BatchResult>> {
        if scheme.is_empty() {
            return Err(AppError::Validation("scheme must not be empty".to_string()));
        }
        if items.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(item) = items.iter().find(|item| item.original_url.is_empty()) {
            return Err(AppError::Validation(format!(
                "empty URL for correlation id '{}'",
                item.correlation_id
            )));
        }

        let records: Vec<NewUrl> = items
            .iter()
            .map(|item| NewUrl::new(owner, item.original_url.as_str()))
            .collect();

        self.storage.save_all(&records).await?;
        info!(count = records.len(), "Created short URL batch");

        Ok(items
            .into_iter()
            .zip(records)
            .map(|(item, record)| BatchResult {
                correlation_id: item.correlation_id,
                short_url: self.compose(scheme, &record.short_code),
            })
            .collect())
    }

    /// Original URL behind `short_code`.
    ///
    /// # Errors
    /// `NotFound` if the code never existed, `Gone` if it was deleted.
    #[instrument(skip(self))]
    pub async fn resolve(&self, short_code: &str) -> Result<String> {
        if short_code.is_empty() {
            return Err(AppError::Validation("short code must not be empty".to_string()));
        }

        Ok(self.storage.get(short_code).await?.original_url)
    }

    /// Record by its storage sequence id.
    pub async fn url_by_id(&self, id: i64) -> Result<UrlRecord> {
        self.storage.get_by_id(id).await
    }

    /// Hand `request` to the deletion worker. Waits only while its queue is full.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, count = request.urls.len()))]
    pub async fn enqueue_delete(&self, request: DeleteRequest) {
        self.deletions.enqueue(request).await;
    }

    /// Live URLs of `owner` as absolute short URLs, oldest first.
    pub async fn list_owned(&self, owner: &str) -> Result<Vec<OwnedUrl>> {
        let records = self.storage.get_all_by_user(owner).await?;

        Ok(records
            .into_iter()
            .map(|record| OwnedUrl {
                short_url: self.compose(DEFAULT_SCHEME, &record.short_code),
                original_url: record.original_url,
            })
            .collect())
    }

    /// Backend liveness. `Unsupported` for backends without a remote store.
    pub async fn ping(&self) -> Result<()> {
        self.storage.ping().await
    }

    /// Stop the deletion worker after its final flush.
    pub async fn shutdown(&self) {
        self.deletions.shutdown().await;
    }

    fn compose(&self, scheme: &str, code: &str) -> String {
        compose_short_url(&self.base_url, scheme, code)
    }
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::database::MemoryRepository;
    use async_trait::async_trait;
    use mockall::mock;
    use pretty_assertions::assert_eq;

    mock! {
        Storage {}

        #[async_trait]
        impl StorageBackend for Storage {
            fn kind(&self) -> &'static str;
            async fn ping(&self) -> Result<()>;
            async fn save(&self, record: &NewUrl) -> Result<Saved>;
            async fn save_all(&self, records: &[NewUrl]) -> Result<()>;
            async fn get(&self, short_code: &str) -> Result<UrlRecord>;
            async fn get_by_id(&self, id: i64) -> Result<UrlRecord>;
            async fn get_all_by_user(&self, user_id: &str) -> Result<Vec<UrlRecord>>;
            async fn delete_batch(&self, user_id: &str, short_codes: &[String]) -> Result<()>;
        }
    }

    fn mock_storage() -> MockStorage {
        let mut storage = MockStorage::new();
        storage.expect_kind().return_const("mock");
        storage
    }

    fn service(storage: Arc<dyn StorageBackend>) -> UrlService {
        let config = ConfigBuilder::new().base_url("localhost:8080").build();
        UrlService::new(storage, &config, CancellationToken::new())
    }

    #[tokio::test]
    async fn test_shorten_twice_returns_same_url() {
        let service = service(Arc::new(MemoryRepository::new()));

        let first = service.shorten("http", "user-1", "https://example.com").await.unwrap();
        let second = service.shorten("http", "user-1", "https://example.com").await.unwrap();

        assert_eq!(first, Shortened::Created("http://localhost:8080/20381BAK".to_string()));
        assert_eq!(
            second,
            Shortened::AlreadyExists("http://localhost:8080/20381BAK".to_string())
        );
        assert_eq!(service.resolve("20381BAK").await.unwrap(), "https://example.com");
    }

    #[tokio::test]
    async fn test_empty_input_never_reaches_storage() {
        // No save expectations: any storage call would panic.
        let service = service(Arc::new(mock_storage()));

        assert!(matches!(
            service.shorten("http", "u", "").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.shorten("", "u", "https://a.example").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(service.resolve("").await, Err(AppError::Validation(_))));
        assert!(service.shorten_batch("http", "u", vec![]).await.unwrap().is_empty());
        assert!(matches!(
            service
                .shorten_batch("http", "u", vec![BatchItem::new("1", "")])
                .await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_failure_returns_no_results() {
        let mut storage = mock_storage();
        storage
            .expect_save_all()
            .times(1)
            .returning(|_| Err(AppError::Conflict("duplicate".to_string())));
        let service = service(Arc::new(storage));

        let result = service
            .shorten_batch(
                "http",
                "u",
                vec![BatchItem::new("1", "https://a.example"), BatchItem::new("2", "https://b.example")],
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_batch_results_keep_input_order() {
        let service = service(Arc::new(MemoryRepository::new()));

        let results = service
            .shorten_batch(
                "https",
                "u",
                vec![BatchItem::new("b", "https://ya.ru"), BatchItem::new("a", "https://example.com")],
            )
            .await
            .unwrap();

        assert_eq!(
            results,
            vec![
                BatchResult {
                    correlation_id: "b".to_string(),
                    short_url: "https://localhost:8080/FQ8A9UE3".to_string(),
                },
                BatchResult {
                    correlation_id: "a".to_string(),
                    short_url: "https://localhost:8080/20381BAK".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_passes_tombstone_through() {
        let mut storage = mock_storage();
        storage
            .expect_get()
            .returning(|code| Err(AppError::url_deleted(code)));
        let service = service(Arc::new(storage));

        assert!(matches!(service.resolve("20381BAK").await, Err(AppError::Gone(_))));
    }

    #[tokio::test]
    async fn test_ping_unsupported_on_memory() {
        let service = service(Arc::new(MemoryRepository::new()));
        assert!(matches!(service.ping().await, Err(AppError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_list_owned_uses_http_scheme() {
        let service = service(Arc::new(MemoryRepository::new()));
        service.shorten("https", "owner", "https://example.com").await.unwrap();
        service.shorten("https", "other", "https://ya.ru").await.unwrap();

        let owned = service.list_owned("owner").await.unwrap();
        assert_eq!(
            owned,
            vec![OwnedUrl {
                short_url: "http://localhost:8080/20381BAK".to_string(),
                original_url: "https://example.com".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_shutdown_flushes_enqueued_delete() {
        let storage = Arc::new(MemoryRepository::new());
        let service = service(storage.clone());
        service.shorten("http", "owner", "https://example.com").await.unwrap();

        service
            .enqueue_delete(DeleteRequest::new("owner", vec!["20381BAK".to_string()]))
            .await;
        service.shutdown().await;

        assert!(matches!(service.resolve("20381BAK").await, Err(AppError::Gone(_))));
    }
}
