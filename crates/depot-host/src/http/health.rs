use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use depot_core::RefreshReport;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::server::ServerState;

#[derive(Default)]
pub struct HealthState {
    meta: parking_lot::Mutex<HealthMeta>,
}

#[derive(Default, Clone)]
struct HealthMeta {
    last_refresh: Option<OffsetDateTime>,
    last_error: Option<String>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a scan. Partial failures still count as a
    /// refresh but are surfaced as the last error.
    pub fn record_refresh(&self, report: &RefreshReport) {
        let mut meta = self.meta.lock();
        meta.last_refresh = Some(OffsetDateTime::now_utc());
        meta.last_error = report.failures.first().map(|first| {
            if report.failures.len() == 1 {
                first.to_string()
            } else {
                format!("{first} (and {} more)", report.failures.len() - 1)
            }
        });
    }

    pub fn record_refresh_error(&self, err: &anyhow::Error) {
        let mut meta = self.meta.lock();
        meta.last_error = Some(err.to_string());
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let meta = self.meta.lock().clone();
        HealthSnapshot {
            last_refresh: meta.last_refresh,
            last_error: meta.last_error,
        }
    }
}

pub struct HealthSnapshot {
    pub last_refresh: Option<OffsetDateTime>,
    pub last_error: Option<String>,
}

pub async fn handler(State(state): State<ServerState>) -> impl IntoResponse {
    let snapshot = state.health.snapshot();
    let packages = state.index.len();
    let status = if packages > 0 && snapshot.last_error.is_none() {
        "ok"
    } else {
        "degraded"
    };
    let last_refresh = snapshot
        .last_refresh
        .and_then(|ts| ts.format(&Rfc3339).ok());
    Json(serde_json::json!({
        "status": status,
        "packages": packages,
        "lastRefresh": last_refresh,
        "lastError": snapshot.last_error,
    }))
}
