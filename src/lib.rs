//! netvigil -- streaming per-device network telemetry anomaly detection.
//!
//! This crate provides the rolling-window anomaly engine, its recommendation
//! catalog, an optional SQLite anomaly journal, and a thin HTTP API.

pub mod api;
pub mod config;
pub mod detect;
pub mod storage;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::NetvigilConfig;
use crate::detect::journal::AnomalyJournal;
use crate::detect::AnomalyEngine;

/// Start the netvigil daemon: anomaly engine behind the HTTP API.
pub async fn serve(config: NetvigilConfig) -> Result<()> {
    config.validate()?;

    // 1. Initialize Storage
    let journal = if config.storage.journal_enabled {
        let db_path = config.storage.db_path.clone();
        tracing::info!(db_path = %db_path.display(), "Initializing anomaly journal");
        let pool = tokio::task::spawn_blocking(move || storage::open_pool(&db_path))
            .await
            .context("storage init task panicked")??;
        Some(AnomalyJournal::new(pool))
    } else {
        tracing::info!("Anomaly journal disabled");
        None
    };

    // 2. Initialize Engine
    let engine = Arc::new(AnomalyEngine::from_config(&config));
    tracing::info!(
        capacity = config.engine.capacity,
        window = config.engine.window,
        min_samples = config.engine.min_samples,
        "Anomaly engine ready"
    );

    // 3. Start API Server
    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", config.server.bind))?;
    let app = api::router(api::state::AppState { engine, journal });

    tracing::info!(%addr, "netvigil listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
