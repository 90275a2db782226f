//! # Domain models
//!
//! - **Entity**: `UrlRecord`, what a backend stores
//! - **Inputs**: `NewUrl`, `DeleteRequest`, request DTOs
//! - **Outcomes**: `Saved`, `Shortened`, response DTOs
//! - **Identity**: `Claims` of the owner token

mod dto;
mod owner;
mod url;

pub use dto::*;
pub use owner::*;
pub use url::*;
