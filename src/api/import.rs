use crate::{
    database::Database,
    identity::Directory,
    transfer::{sanitize_filename, MediaTransfer},
    webhook::{capture_media, Capture, MediaKind, Outcome},
};
use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ImportArgs {
    #[serde(default)]
    pub sender_phone: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    pub items: Vec<ImportItem>,
}

#[derive(Debug, Deserialize)]
pub struct ImportItem {
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub success: bool,
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Import media that already lives at a reachable URL. Items whose label is
/// already in the inbox are skipped, so an import can be repeated safely.
pub async fn import(
    Extension(database): Extension<Database>,
    Extension(transfer): Extension<MediaTransfer>,
    Extension(directory): Extension<Directory>,
    Json(request): Json<ImportArgs>,
) -> impl IntoResponse {
    let sender_phone = request.sender_phone.unwrap_or_default();
    let sender_name = request
        .sender_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| match sender_phone.is_empty() {
            true => "Import".to_string(),
            false => directory.resolve(&sender_phone),
        });

    let mut report = ImportReport::default();

    for item in &request.items {
        let filename = filename_from_url(&item.url);
        let content_type = item
            .content_type
            .clone()
            .or_else(|| guess_content_type(&filename).map(str::to_string));

        let Some((kind, content_type)) = content_type
            .and_then(|ct| MediaKind::imported(&ct).map(|kind| (kind, ct)))
        else {
            report.failed += 1;
            report.errors.push(format!("{}: unsupported media type", item.url));
            continue;
        };

        match database.content_exists(&kind.content(&filename)).await {
            Ok(true) => {
                log::debug!("Skipping {filename}, already imported");
                report.skipped += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                log::error!("Failed to check import of {filename}: {e:#}");
                report.failed += 1;
                report.errors.push(format!("{}: {e}", item.url));
                continue;
            }
        }

        let capture = Capture {
            sender_name: &sender_name,
            sender_phone: &sender_phone,
            kind,
            source_url: &item.url,
            content_type: &content_type,
            filename,
        };

        match capture_media(&database, &transfer, capture).await {
            Ok((_, Outcome::Saved | Outcome::AlreadySaved)) => report.imported += 1,
            Ok((_, Outcome::Failed(e))) => {
                report.failed += 1;
                report.errors.push(format!("{}: {e}", item.url));
            }
            Err(e) => {
                log::error!("Failed to import {}: {e:#}", item.url);
                report.failed += 1;
                report.errors.push(format!("{}: {e}", item.url));
            }
        }
    }

    log::info!(
        "Import for {sender_name}: {} imported, {} skipped, {} failed",
        report.imported,
        report.skipped,
        report.failed
    );

    report.success = report.failed == 0;
    let status = match report.success {
        true => StatusCode::OK,
        false => StatusCode::MULTI_STATUS,
    };
    (status, Json(report)).into_response()
}

/// Last path segment of the URL, made safe for object keys.
fn filename_from_url(url: &str) -> String {
    let name = reqwest::Url::parse(url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "import".to_string());
    sanitize_filename(&name)
}

fn guess_content_type(filename: &str) -> Option<&'static str> {
    let (_, extension) = filename.rsplit_once('.')?;
    match extension.to_ascii_lowercase().as_str() {
        "wav" => Some("audio/wav"),
        "mp3" => Some("audio/mpeg"),
        "m4a" | "mp4" => Some("audio/mp4"),
        "aac" => Some("audio/aac"),
        "amr" => Some("audio/amr"),
        "ogg" | "oga" => Some("audio/ogg"),
        "flac" => Some("audio/flac"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app,
        database::ContentType,
        transfer::testing::{FakeSource, FakeStore},
        webhook::tests::fast_transfer,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Request},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn post(router: &Router, body: Value) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/import")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn filenames_come_from_the_url_path() {
        assert_eq!(
            filename_from_url("https://old-host.example/media/demo%20take.m4a?sig=1"),
            "demo_20take.m4a"
        );
        assert_eq!(filename_from_url("https://old-host.example/"), "import");
        assert_eq!(guess_content_type("demo.M4A"), Some("audio/mp4"));
        assert_eq!(guess_content_type("notes.txt"), None);
    }

    #[tokio::test]
    async fn repeated_import_is_skipped() {
        let store = Arc::new(FakeStore::new());
        let transfer = fast_transfer(Arc::new(FakeSource::ready(vec![1; 2048])), store.clone());
        let (router, database) = app::test_app(transfer).await;
        let body = json!({
            "sender_phone": "+16783614280",
            "items": [
                { "url": "https://old-host.example/media/hook.wav" },
                { "url": "https://old-host.example/media/cover.jpg", "content_type": "image/jpeg" },
                { "url": "https://old-host.example/media/notes.txt" }
            ]
        });

        let (status, first) = post(&router, body.clone()).await;
        assert_eq!(status, StatusCode::MULTI_STATUS);
        assert_eq!(first["imported"], 2);
        assert_eq!(first["failed"], 1);

        let (_, second) = post(&router, body).await;
        assert_eq!(second["imported"], 0);
        assert_eq!(second["skipped"], 2);

        let items = database.list_items().await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.sender_name == "Asia"));
        assert!(items.iter().any(|i| i.content == "Imported - hook.wav" && i.content_type == ContentType::Voice));
        assert!(items.iter().any(|i| i.content == "Imported - cover.jpg" && i.content_type == ContentType::Image));
        assert_eq!(store.put_count(), 2);
    }

    #[tokio::test]
    async fn failed_import_can_be_retried() {
        let transfer = fast_transfer(Arc::new(FakeSource::failing("HTTP 403 Forbidden")), Arc::new(FakeStore::new()));
        let (router, database) = app::test_app(transfer).await;
        let body = json!({ "sender_name": "Sebastian", "items": [{ "url": "https://old-host.example/a.mp3" }] });

        let (_, first) = post(&router, body.clone()).await;
        let (_, second) = post(&router, body).await;

        assert_eq!(first["failed"], 1);
        assert_eq!(second["failed"], 1);
        assert_eq!(second["skipped"], 0);
        let items = database.list_items().await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.is_diagnostic() && i.sender_name == "Sebastian"));
    }
}
