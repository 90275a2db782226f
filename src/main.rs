//! # URL Shortener - binary entry point
//!
//! Loads `.env`, reads flags and environment, opens the selected storage
//! backend and serves HTTP until Ctrl-C. On shutdown the deletion worker
//! gets to flush whatever it still holds.

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shortener::{api::create_router, config::Config, database, services::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load().context("invalid configuration")?;
    init_tracing(&config);

    info!("Starting URL shortener");

    let storage = database::open(&config)
        .await
        .context("failed to open storage")?;

    let cancel = CancellationToken::new();
    let state = AppState::new(storage, &config, cancel.clone());
    let url_service = state.url_service.clone();
    let app = create_router(state);

    let listener = TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server_address))?;
    info!(address = %config.server_address, base_url = %config.base_url, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .context("server error")?;

    url_service.shutdown().await;
    info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl-C and cancels background work.
async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
    }
    info!("Shutdown signal received");
    cancel.cancel();
}

/// `RUST_LOG` wins; otherwise `LOG_LEVEL` applies to this crate and
/// tower_http. JSON output in production, pretty output elsewhere.
fn init_tracing(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "shortener={level},tower_http={level}",
            level = config.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.environment.is_production() {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}
