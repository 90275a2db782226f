//! # URL Shortener Library
//!
//! Derives short codes from URLs, stores them in one of three
//! interchangeable backends and deletes them in coalesced background
//! batches.
//!
//! ```text
//! src/
//! ├── lib.rs
//! ├── main.rs         # binary entry point
//! ├── config/         # settings from the environment
//! ├── error/          # AppError and its HTTP mapping
//! ├── database/       # StorageBackend + memory, file, sqlite
//! ├── models/         # records, DTOs, token claims
//! ├── services/       # UrlService, AuthService, DeletionCoalescer
//! ├── api/            # axum router, middleware, handlers
//! └── utils/          # short code generation, URL composition
//! ```
//!
//! ```rust,no_run
//! use shortener::{config::Config, database, services::AppState};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> shortener::Result<()> {
//!     let config = Config::load()?;
//!     let storage = database::open(&config).await?;
//!     let state = AppState::new(storage, &config, CancellationToken::new());
//!     let app = shortener::api::create_router(state);
//!     # let _ = app;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

// =====================================
// Re-exports
// =====================================
pub use error::AppError;
pub use error::Result;

// =====================================
// Prelude Module
// =====================================
/// ```rust
/// use shortener::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::database::StorageBackend;
    pub use crate::error::{AppError, Result};
    pub use crate::models::*;
    pub use crate::services::*;
}
