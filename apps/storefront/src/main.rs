//! # Maple Storefront Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  config (TOML + MAPLE_* env) ──► SQLite ──► snapshot ──► AppState      │
//! │                                                              │          │
//! │                            refresher (interval) ◄────────────┤          │
//! │                                                              ▼          │
//! │                                         axum::serve(bind_address)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `maple-storefront [config.toml]` (or `MAPLE_CONFIG=...`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use maple_core::cache::SystemClock;
use maple_db::{Database, DbConfig};
use maple_storefront::state::report_setting_problems;
use maple_storefront::{build_router, spawn_refresher, AppState, StorefrontConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Maple storefront...");

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MAPLE_CONFIG").ok())
        .map(PathBuf::from);
    let config = StorefrontConfig::load(config_path.as_deref()).context("loading configuration")?;
    info!(
        bind = %config.bind_address,
        database = %config.database_path.display(),
        guard = ?config.purchase_guard,
        "Configuration loaded"
    );

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let db = Database::new(DbConfig::new(config.database_path.clone()))
        .await
        .context("opening database")?;

    let snapshot = db.snapshot().await.context("loading catalog snapshot")?;
    info!(products = snapshot.product_count(), "Catalog snapshot loaded");
    report_setting_problems(&snapshot);

    let state = Arc::new(
        AppState::new(
            snapshot,
            Arc::new(SystemClock),
            config.engine_options(),
            config.cookie_policy()?,
        )
        .with_cart_idle(config.cart_idle())
        .with_database(db),
    );
    let refresher = spawn_refresher(state.clone(), config.refresh_interval());

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;
    info!(addr = %config.bind_address, "Storefront listening");

    axum::serve(listener, build_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    refresher.abort();
    if let Some(db) = &state.db {
        db.close().await;
    }
    info!("Storefront shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
