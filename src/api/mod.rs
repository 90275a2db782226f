//! # API layer
//!
//! | Route | Handler |
//! |---|---|
//! | `POST /` | shorten, text in and out (`text/plain`, `text/html` or `application/x-gzip`) |
//! | `POST /api/shorten` | shorten, JSON |
//! | `POST /api/shorten/batch` | batch shorten, JSON |
//! | `GET /:code` | redirect |
//! | `GET /api/urls/:id` | record by sequence id |
//! | `GET /api/user/urls` | caller's live URLs |
//! | `DELETE /api/user/urls` | queue deletion of caller's codes |
//! | `GET /ping` | backend liveness |
//! | `GET /health` | process liveness |
//!
//! Every request passes through `identify`, so handlers always see an owner.

mod extractors;
mod handlers;
mod middleware;

pub use extractors::*;
pub use handlers::*;
pub use middleware::*;

use std::time::Duration;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    decompression::RequestDecompressionLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::services::AppState;

// =====================================
// Router Builder
// =====================================
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            post(handlers::url::shorten_text)
                .route_layer(axum_middleware::from_fn(middleware::require_text_body)),
        )
        .route("/:code", get(handlers::url::redirect))
        .route("/ping", get(handlers::health::ping))
        .route("/health", get(handlers::health::health_check))
        .nest("/api", api_routes())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::identify,
        ))
        .layer(axum_middleware::from_fn(middleware::request_timing))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CompressionLayer::new())
                .layer(RequestDecompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(handlers::url::shorten_json))
        .route("/shorten/batch", post(handlers::url::shorten_batch))
        .route("/urls/:id", get(handlers::url::url_by_id))
        .route(
            "/user/urls",
            get(handlers::user::list_urls).delete(handlers::user::delete_urls),
        )
}
