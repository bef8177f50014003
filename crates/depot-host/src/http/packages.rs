use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use crate::http::error::ApiError;
use crate::server::ServerState;

pub async fn list(State(state): State<ServerState>) -> Json<Value> {
    let index = state.index.list();
    Json(json!({
        "count": index.len(),
        "packages": &*index,
    }))
}

pub async fn search(State(state): State<ServerState>, Path(query): Path<String>) -> Json<Value> {
    search_response(&state, query)
}

/// `/api/search` with no fragment: the empty query, which matches everything.
pub async fn search_all(State(state): State<ServerState>) -> Json<Value> {
    search_response(&state, String::new())
}

fn search_response(state: &ServerState, query: String) -> Json<Value> {
    let results = state.index.search(&query);
    Json(json!({
        "query": query,
        "count": results.len(),
        "results": results,
    }))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let versions = state.index.get(&name)?;
    Ok(Json(json!({ "name": name, "versions": versions })))
}
