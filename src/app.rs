use crate::{
    api, database::Database, identity::Directory, secrets::Secrets, transfer::MediaTransfer, webhook,
};
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use twilio::Client as TwilioClient;

/// Everything the handlers share.
pub struct Components {
    pub secrets: Secrets,
    pub database: Database,
    pub twilio: TwilioClient,
    pub transfer: MediaTransfer,
    pub directory: Directory,
}

pub fn router(components: Components) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/health_check", get(health_check))
        .route("/twilio/voice", post(webhook::voice::voice_handler))
        .route("/twilio/recording", post(webhook::recording::recording_handler))
        .route("/twilio/recording-status", post(webhook::status::status_handler))
        .route("/twilio/sms", post(webhook::message::message_handler))
        .route("/twilio/menu", post(webhook::menu::menu_handler))
        .route("/api/inbox", get(api::inbox::inbox_list))
        .route(
            "/api/inbox/:id",
            delete(api::inbox::delete_item).patch(api::inbox::rename_item),
        )
        .route("/api/inbox/:id/promote", post(api::inbox::promote_item))
        .route("/api/refresh-url/:id", get(api::refresh_url::refresh_url))
        .route("/api/import", post(api::import::import))
        .route("/api/status", get(api::status::system_status))
        .route("/api/songs", get(api::songs::song_list))
        .route("/api/save_song", post(api::songs::save_song))
        .route("/api/merge_songs", post(api::songs::merge_songs))
        .route("/api/delete_song/:id", delete(api::songs::delete_song))
        .fallback(not_found)
        .layer(cors)
        .layer(Extension(components.secrets))
        .layer(Extension(components.twilio))
        .layer(Extension(components.transfer))
        .layer(Extension(components.directory))
        .layer(Extension(components.database))
}

pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not Found" })),
    )
}

/// The full router over an in-memory database, with the caller's transfer
/// client and a Twilio client without credentials.
#[cfg(test)]
pub async fn test_app(transfer: MediaTransfer) -> (Router, Database) {
    let database = Database::in_memory().await;
    let components = Components {
        secrets: Secrets::for_tests(),
        database: database.clone(),
        twilio: TwilioClient::new("", ""),
        transfer,
        directory: Directory::from_config(None),
    };
    (router(components), database)
}
