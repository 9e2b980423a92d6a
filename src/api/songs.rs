use super::{failure, internal_error};
use crate::database::Database;
use axum::{extract::Path, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

fn untitled() -> String {
    "Untitled".to_string()
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct SaveSongArgs {
    // replaces the song with this id, creates a new one when absent
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default)]
    pub lyrics: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub audio_files: Vec<String>,
    #[serde(default)]
    pub voice_notes: Vec<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct MergeSongsArgs {
    pub source_id: i64,
    pub target_id: i64,
    #[serde(default)]
    pub delete_source: bool,
}

pub async fn song_list(Extension(database): Extension<Database>) -> impl IntoResponse {
    match database.list_songs().await {
        Ok(songs) => Json(json!({ "songs": songs })).into_response(),
        Err(e) => internal_error("Failed to load songs", e),
    }
}

pub async fn save_song(
    Extension(database): Extension<Database>,
    Json(request): Json<SaveSongArgs>,
) -> impl IntoResponse {
    match database.save_song(&request).await {
        Ok(Some(id)) => {
            log::info!("Saved song {id} ({})", request.title);
            Json(json!({ "success": true, "id": id })).into_response()
        }
        Ok(None) => failure(StatusCode::NOT_FOUND, "Song not found"),
        Err(e) => internal_error("Failed to save song", e),
    }
}

pub async fn merge_songs(
    Extension(database): Extension<Database>,
    Json(request): Json<MergeSongsArgs>,
) -> impl IntoResponse {
    if request.source_id == request.target_id {
        return failure(StatusCode::BAD_REQUEST, "Cannot merge a song into itself");
    }

    match database
        .merge_songs(request.source_id, request.target_id, request.delete_source)
        .await
    {
        Ok(true) => {
            log::info!("Merged song {} into {}", request.source_id, request.target_id);
            Json(json!({ "success": true })).into_response()
        }
        Ok(false) => failure(StatusCode::NOT_FOUND, "Song not found"),
        Err(e) => internal_error("Failed to merge songs", e),
    }
}

pub async fn delete_song(
    Extension(database): Extension<Database>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match database.delete_song(id).await {
        Ok(true) => Json(json!({ "success": true })).into_response(),
        Ok(false) => failure(StatusCode::NOT_FOUND, "Song not found"),
        Err(e) => internal_error("Failed to delete song", e),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        app,
        transfer::testing::{FakeSource, FakeStore},
        webhook::tests::fast_transfer,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn save_merge_and_delete() {
        let transfer = fast_transfer(Arc::new(FakeSource::ready(Vec::new())), Arc::new(FakeStore::new()));
        let (router, _) = app::test_app(transfer).await;

        let (_, target) = call(
            &router,
            "POST",
            "/api/save_song",
            Some(json!({ "title": "Embers", "audio_files": ["a1"], "voice_notes": ["v1"] })),
        )
        .await;
        let (_, source) = call(
            &router,
            "POST",
            "/api/save_song",
            Some(json!({ "audio_files": ["a2", "a3"] })),
        )
        .await;
        let target_id = target["id"].as_i64().unwrap();
        let source_id = source["id"].as_i64().unwrap();

        let (status, _) = call(
            &router,
            "POST",
            "/api/merge_songs",
            Some(json!({ "source_id": source_id, "target_id": target_id, "delete_source": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, list) = call(&router, "GET", "/api/songs", None).await;
        let songs = list["songs"].as_array().unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0]["title"], "Embers");
        assert_eq!(songs[0]["audio_files"], json!(["a1", "a2", "a3"]));
        assert_eq!(songs[0]["voice_notes"], json!(["v1"]));

        let (status, _) = call(&router, "DELETE", &format!("/api/delete_song/{target_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&router, "DELETE", &format!("/api/delete_song/{target_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn merge_needs_two_songs() {
        let transfer = fast_transfer(Arc::new(FakeSource::ready(Vec::new())), Arc::new(FakeStore::new()));
        let (router, _) = app::test_app(transfer).await;

        let (status, _) = call(
            &router,
            "POST",
            "/api/merge_songs",
            Some(json!({ "source_id": 1, "target_id": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &router,
            "POST",
            "/api/merge_songs",
            Some(json!({ "source_id": 1, "target_id": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
