use crate::{database::Database, identity::Directory, transfer::MediaTransfer};
use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub ready: bool,
    pub telephony_configured: bool,
    pub storage_configured: bool,
    pub database_reachable: bool,
    pub known_senders: usize,
}

/// Whether calls and messages can currently be captured end to end.
pub async fn system_status(
    Extension(database): Extension<Database>,
    Extension(transfer): Extension<MediaTransfer>,
    Extension(directory): Extension<Directory>,
) -> impl IntoResponse {
    let database_reachable = match database.ping().await {
        Ok(()) => true,
        Err(e) => {
            log::error!("Database is unreachable: {e:#}");
            false
        }
    };

    let status = SystemStatus {
        ready: transfer.is_ready() && database_reachable,
        telephony_configured: transfer.source_configured(),
        storage_configured: transfer.store_configured(),
        database_reachable,
        known_senders: directory.len(),
    };

    let code = match status.ready {
        true => StatusCode::OK,
        false => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(status))
}
