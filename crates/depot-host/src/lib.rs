#![forbid(unsafe_code)]

//! HTTP host for the package depot.
//!
//! Wires the index service and download tracker from `depot-core` into an
//! axum router, with an optional background rescan.

pub mod config;
pub mod http;
pub mod server;
pub mod telemetry;
pub mod watcher;

use std::sync::Arc;

use anyhow::{Context, Result};
use depot_core::{DownloadTracker, IndexService, JsonFileStore};
use tokio::task;

pub use config::DepotConfig;
pub use http::health::HealthState;
pub use server::{DepotServer, ServerState, router};

/// Build the index and counter store described by `cfg`.
pub async fn build_state(cfg: &DepotConfig) -> Result<ServerState> {
    let root = cfg.packages_dir.clone();
    let (index, report) = task::spawn_blocking(move || IndexService::open_with_report(root))
        .await
        .context("initial index scan failed")?;
    let health = Arc::new(HealthState::new());
    health.record_refresh(&report);

    let stats_path = cfg.stats_path.clone();
    let store = task::spawn_blocking(move || JsonFileStore::load(stats_path))
        .await
        .context("loading download stats failed")?;

    Ok(ServerState {
        index: Arc::new(index),
        tracker: DownloadTracker::new(Arc::new(store)),
        health,
    })
}

/// Serve until shutdown.
pub async fn run(cfg: DepotConfig) -> Result<()> {
    let state = build_state(&cfg).await?;
    let _watcher = cfg.refresh_interval.map(|period| {
        watcher::start_index_watcher(Arc::clone(&state.index), Arc::clone(&state.health), period)
    });
    DepotServer::new(cfg.port, state).serve().await
}
