use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::http::error::ApiError;
use crate::server::ServerState;
use crate::watcher::refresh_index;

pub async fn refresh(State(state): State<ServerState>) -> Result<Json<Value>, ApiError> {
    let count = refresh_index(&state.index, &state.health).await?;
    tracing::info!(count, "package index refresh requested");
    Ok(Json(json!({
        "message": "Package index refreshed",
        "count": count,
    })))
}

pub async fn stats(State(state): State<ServerState>) -> Json<Value> {
    Json(json!(state.tracker.snapshot()))
}
