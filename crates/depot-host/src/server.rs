use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::{Router, serve};
use depot_core::{DownloadTracker, IndexService};
use tokio::net::TcpListener;

use crate::http::{self, admin, download, health::HealthState, packages};

pub struct DepotServer {
    addr: SocketAddr,
    router: Router,
}

impl DepotServer {
    pub fn new(port: u16, state: ServerState) -> Self {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        Self {
            addr,
            router: router(state),
        }
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!(addr = %self.addr, "starting depot server");
        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("depot server stopped");
        Ok(())
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/packages", get(packages::list))
        .route("/api/search", get(packages::search_all))
        .route("/api/search/{query}", get(packages::search))
        .route("/api/package/{name}", get(packages::get))
        .route("/api/refresh", post(admin::refresh))
        .route("/api/stats", get(admin::stats))
        .route("/packages/{name}", get(download::latest))
        .route("/packages/{name}/{version}", get(download::pinned))
        .route("/healthz", get(http::health::handler))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub index: Arc<IndexService>,
    pub tracker: DownloadTracker,
    pub health: Arc<HealthState>,
}
