use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use depot_core::IndexService;
use tokio::task;
use tokio::time::{Instant, MissedTickBehavior};

use crate::http::health::HealthState;

/// Background task that rescans the package directory on a fixed interval.
/// Dropping the watcher stops the task.
pub struct IndexWatcher {
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for IndexWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn start_index_watcher(
    index: Arc<IndexService>,
    health: Arc<HealthState>,
    period: Duration,
) -> IndexWatcher {
    let handle = tokio::spawn(async move {
        // The index was just built at startup, so the first rescan waits a
        // full period.
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = refresh_index(&index, &health).await {
                tracing::error!(error = %err, "scheduled index refresh failed");
            }
        }
    });
    tracing::info!(period = %humantime::format_duration(period), "index watcher started");
    IndexWatcher { handle }
}

/// Rescan on a blocking thread, publish the result and record it in the
/// health state. Returns the new package count.
pub async fn refresh_index(index: &Arc<IndexService>, health: &HealthState) -> Result<usize> {
    let index = Arc::clone(index);
    let outcome = task::spawn_blocking(move || index.refresh_with_report())
        .await
        .context("index refresh task failed");
    match outcome {
        Ok(report) => {
            health.record_refresh(&report);
            Ok(report.packages)
        }
        Err(err) => {
            health.record_refresh_error(&err);
            Err(err)
        }
    }
}
