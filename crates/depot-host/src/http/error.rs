use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use depot_core::LookupError;
use serde_json::json;

/// Failure surfaced by a handler, rendered as a JSON body.
#[derive(Debug)]
pub enum ApiError {
    Lookup(LookupError),
    Internal(anyhow::Error),
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        Self::Lookup(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Lookup(LookupError::PackageNotFound { name }) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Package not found", "name": name })),
            )
                .into_response(),
            Self::Lookup(LookupError::VersionNotFound {
                name,
                version,
                available,
            }) => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "Version not found",
                    "name": name,
                    "version": version,
                    "available": available,
                })),
            )
                .into_response(),
            Self::Lookup(LookupError::FileMissing { filename, .. }) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Package file not found", "filename": filename })),
            )
                .into_response(),
            Self::Internal(err) => {
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": err.to_string() })),
                )
                    .into_response()
            }
        }
    }
}
