use std::io::ErrorKind;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::Response;
use depot_core::{LookupError, ResolvedDownload};
use tokio::fs::File;
use tokio::task;
use tokio_util::io::ReaderStream;

use crate::http::error::ApiError;
use crate::server::ServerState;

pub async fn latest(
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    serve(state, name, None).await
}

pub async fn pinned(
    State(state): State<ServerState>,
    Path((name, version)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    serve(state, name, Some(version)).await
}

async fn serve(
    state: ServerState,
    name: String,
    version: Option<String>,
) -> Result<Response, ApiError> {
    let index = Arc::clone(&state.index);
    let resolved = task::spawn_blocking(move || index.resolve_download(&name, version.as_deref()))
        .await
        .context("download resolution task failed")??;

    let opened = File::open(&resolved.path).await;
    let file = match opened {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(missing(resolved).into());
        }
        Err(err) => {
            return Err(anyhow!(err)
                .context(format!("failed to open {}", resolved.path.display()))
                .into());
        }
    };
    let length = file.metadata().await.ok().map(|meta| meta.len());
    let disposition = HeaderValue::try_from(attachment(&resolved.entry.filename))
        .context("failed to encode download filename")?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/octet-stream")
        .header(CONTENT_DISPOSITION, disposition);
    if let Some(length) = length {
        builder = builder.header(CONTENT_LENGTH, length);
    }
    let response = builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .context("failed to build download response")?;

    let tracker = state.tracker.clone();
    let (package, version) = (resolved.name.clone(), resolved.entry.version.clone());
    task::spawn_blocking(move || tracker.record(&package, &version))
        .await
        .context("download tracking task failed")?;
    tracing::info!(
        package = %resolved.name,
        version = %resolved.entry.version,
        "serving download"
    );
    Ok(response)
}

/// `attachment` disposition with `filename` as a quoted string. Quotes and
/// backslashes are escaped; control characters cannot appear in a header and
/// become `_`.
fn attachment(filename: &str) -> String {
    let mut value = String::with_capacity(filename.len() + 24);
    value.push_str("attachment; filename=\"");
    for ch in filename.chars() {
        match ch {
            '"' | '\\' => {
                value.push('\\');
                value.push(ch);
            }
            ch if ch.is_control() => value.push('_'),
            ch => value.push(ch),
        }
    }
    value.push('"');
    value
}

fn missing(resolved: ResolvedDownload) -> LookupError {
    LookupError::FileMissing {
        name: resolved.name,
        version: resolved.entry.version,
        filename: resolved.entry.filename,
    }
}
