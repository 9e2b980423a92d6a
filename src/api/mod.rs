pub mod import;
pub mod inbox;
pub mod refresh_url;
pub mod songs;
pub mod status;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// `{"success": false, "error": ...}` with the given status.
pub(crate) fn failure(status: StatusCode, error: impl Into<String>) -> axum::response::Response {
    (status, Json(json!({ "success": false, "error": error.into() }))).into_response()
}

pub(crate) fn internal_error(context: &str, e: anyhow::Error) -> axum::response::Response {
    log::error!("{context}: {e:#}");
    failure(StatusCode::INTERNAL_SERVER_ERROR, context)
}
