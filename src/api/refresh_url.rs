use super::{failure, internal_error};
use crate::{
    database::Database,
    transfer::{MediaTransfer, TransferError},
    CONFIG,
};
use axum::{extract::Path, http::StatusCode, response::IntoResponse, Extension, Json};
use serde_json::json;
use std::time::Duration;

/// Sign a fresh URL for an item's stored media and keep it on the item.
pub async fn refresh_url(
    Extension(database): Extension<Database>,
    Extension(transfer): Extension<MediaTransfer>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let item = match database.get_item(id).await {
        Ok(Some(item)) => item,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Item not found"),
        Err(e) => return internal_error("Failed to load item", e),
    };

    let Some(reference) = item.media_reference else {
        return failure(StatusCode::NOT_FOUND, "Item has no stored media");
    };

    let expiry = Duration::from_secs(CONFIG.settings.refresh_url_expiry.max(1) as u64);
    let url = match transfer.refresh_url(&reference, expiry).await {
        Ok(url) => url,
        Err(e @ TransferError::InvalidReference(_)) => {
            log::warn!("Cannot refresh item {id}: {e}");
            return failure(StatusCode::BAD_REQUEST, format!("Invalid URL format: {e}"));
        }
        Err(e) => {
            log::error!("Failed to refresh URL of item {id}: {e}");
            return failure(StatusCode::SERVICE_UNAVAILABLE, e.to_string());
        }
    };

    if let Err(e) = database.refresh_media_reference(id, &url).await {
        // The fresh URL is still usable even if it could not be kept
        log::error!("Failed to store refreshed URL of item {id}: {e:#}");
    }

    Json(json!({ "success": true, "url": url })).into_response()
}

#[cfg(test)]
mod tests {
    use crate::{
        app,
        database::{ContentType, Database, NewItem},
        transfer::testing::{FakeSource, FakeStore},
        webhook::tests::{fast_transfer, form_request},
    };
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn stored_recording(router: &Router, database: &Database) -> i64 {
        router
            .clone()
            .oneshot(form_request(
                "/twilio/recording",
                &[
                    ("CallSid", "CA1"),
                    ("From", "+16783614280"),
                    ("RecordingSid", "RE1"),
                    ("RecordingUrl", "https://api.twilio.com/2010-04-01/Accounts/AC123/Recordings/RE1"),
                ],
            ))
            .await
            .unwrap();
        database.get_item_by_recording_sid("RE1").await.unwrap().unwrap().id
    }

    #[tokio::test]
    async fn refreshing_twice_points_at_the_same_object() {
        let store = Arc::new(FakeStore::new());
        let transfer = fast_transfer(Arc::new(FakeSource::ready(vec![4; 2048])), store.clone());
        let (router, database) = app::test_app(transfer).await;
        let id = stored_recording(&router, &database).await;
        let original = database.get_item(id).await.unwrap().unwrap().media_reference.unwrap();

        let (status, first) = get(&router, &format!("/api/refresh-url/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        let (_, second) = get(&router, &format!("/api/refresh-url/{id}")).await;

        let first = first["url"].as_str().unwrap();
        let second = second["url"].as_str().unwrap();
        assert_ne!(first, original);
        assert_ne!(first, second);
        assert!(first.contains("X-Amz-Expires=86400"));
        assert_eq!(store.fetch_signed(first), store.fetch_signed(&original));
        assert_eq!(store.fetch_signed(second), store.fetch_signed(&original));
        assert_eq!(store.put_count(), 1);

        let stored = database.get_item(id).await.unwrap().unwrap();
        assert_eq!(stored.media_reference.as_deref(), Some(second));
    }

    #[tokio::test]
    async fn items_without_media_cannot_be_refreshed() {
        let transfer = fast_transfer(Arc::new(FakeSource::ready(Vec::new())), Arc::new(FakeStore::new()));
        let (router, database) = app::test_app(transfer).await;
        let item = database
            .insert_item(&NewItem::new("Asia", "", ContentType::Text, "Asia - 09:00", "lyrics"))
            .await
            .unwrap();

        let (status, body) = get(&router, &format!("/api/refresh-url/{}", item.id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, _) = get(&router, "/api/refresh-url/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
