//! # HTTP Handlers
//!
//! Thin glue: extract, call a service, map the outcome to a status code.

pub mod health;
pub mod url;
pub mod user;
