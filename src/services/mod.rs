//! # Services
//!
//! ```text
//! ┌──────────────────┐
//! │    API Layer     │  axum handlers
//! ├──────────────────┤
//! │  Service Layer   │  UrlService, AuthService, DeletionCoalescer
//! ├──────────────────┤
//! │  StorageBackend  │  memory | file | sqlite
//! └──────────────────┘
//! ```

mod auth_service;
mod deletion;
mod url_service;

pub use auth_service::*;
pub use deletion::DeletionCoalescer;
pub use url_service::*;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{config::Config, database::StorageBackend};

// =====================================
// Application State
// =====================================
/// Shared by every handler; cloning only bumps reference counts.
#[derive(Clone, Debug)]
pub struct AppState {
    pub url_service: Arc<UrlService>,
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    /// Wire the services over `storage`. Starts the deletion worker, which
    /// stops when `cancel` fires.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        config: &Config,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            url_service: Arc::new(UrlService::new(storage, config, cancel)),
            auth_service: Arc::new(AuthService::new(config)),
        }
    }
}
