use super::{failure, internal_error};
use crate::database::{ContentType, Database, InboxItem};
use axum::{extract::Path, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{ser::Serializer, Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

pub const PROMOTED_PREFIX: &str = "[SONG] ";

#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub id: i64,
    pub sender_name: String,
    pub sender_phone: String,
    pub content_type: ContentType,
    pub title: String,
    pub content: String,
    pub media_reference: Option<String>,
    pub date_bucket: String,
    pub created_at: DateTime<Utc>,
    pub is_diagnostic: bool,
}

impl From<InboxItem> for ItemView {
    fn from(item: InboxItem) -> Self {
        Self {
            is_diagnostic: item.is_diagnostic(),
            id: item.id,
            sender_name: item.sender_name,
            sender_phone: item.sender_phone,
            content_type: item.content_type,
            title: item.title,
            content: item.content,
            media_reference: item.media_reference,
            date_bucket: item.date_bucket,
            created_at: item.created_at,
        }
    }
}

type Days = Vec<(String, Vec<ItemView>)>;

/// Items by sender (alphabetical), then day (newest first), then newest
/// first within the day. Serialized as nested JSON objects in that order.
#[derive(Debug, Default)]
pub struct Grouped {
    senders: Vec<(String, Days)>,
}

impl Grouped {
    pub fn new(mut items: Vec<InboxItem>) -> Self {
        items.sort_by(|a, b| {
            a.sender_name
                .cmp(&b.sender_name)
                .then_with(|| b.date_bucket.cmp(&a.date_bucket))
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });

        let mut senders: Vec<(String, Days)> = Vec::new();
        for item in items {
            if senders.last().map(|(name, _)| name) != Some(&item.sender_name) {
                senders.push((item.sender_name.clone(), Vec::new()));
            }
            let Some((_, days)) = senders.last_mut() else {
                continue;
            };
            if days.last().map(|(bucket, _)| bucket) != Some(&item.date_bucket) {
                days.push((item.date_bucket.clone(), Vec::new()));
            }
            if let Some((_, bucket)) = days.last_mut() {
                bucket.push(ItemView::from(item));
            }
        }

        Self { senders }
    }

    /// Number of diagnostic items per sender.
    pub fn diagnostics(&self) -> BTreeMap<String, usize> {
        self.senders
            .iter()
            .map(|(sender, days)| {
                let count = days
                    .iter()
                    .flat_map(|(_, items)| items)
                    .filter(|item| item.is_diagnostic)
                    .count();
                (sender.clone(), count)
            })
            .collect()
    }
}

struct DaysView<'a>(&'a Days);

impl Serialize for DaysView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(bucket, items)| (bucket, items)))
    }
}

impl Serialize for Grouped {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.senders
                .iter()
                .map(|(sender, days)| (sender, DaysView(days))),
        )
    }
}

#[derive(Serialize)]
struct InboxResponse {
    inbox: Grouped,
    diagnostics: BTreeMap<String, usize>,
}

pub async fn inbox_list(Extension(database): Extension<Database>) -> impl IntoResponse {
    match database.list_items().await {
        Ok(items) => {
            let inbox = Grouped::new(items);
            let diagnostics = inbox.diagnostics();
            Json(InboxResponse { inbox, diagnostics }).into_response()
        }
        Err(e) => {
            log::error!("Failed to load inbox: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "inbox": {} })),
            )
                .into_response()
        }
    }
}

pub async fn delete_item(
    Extension(database): Extension<Database>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match database.delete_item(id).await {
        Ok(true) => {
            log::info!("Deleted inbox item {id}");
            Json(json!({ "success": true })).into_response()
        }
        Ok(false) => failure(StatusCode::NOT_FOUND, "Item not found"),
        Err(e) => internal_error("Failed to delete item", e),
    }
}

#[derive(Debug, Deserialize)]
pub struct RenameArgs {
    pub title: String,
}

pub async fn rename_item(
    Extension(database): Extension<Database>,
    Path(id): Path<i64>,
    Json(request): Json<RenameArgs>,
) -> impl IntoResponse {
    let title = request.title.trim();
    if title.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Title must not be empty");
    }

    match database.rename_item(id, title).await {
        Ok(true) => Json(json!({ "success": true, "title": title })).into_response(),
        Ok(false) => failure(StatusCode::NOT_FOUND, "Item not found"),
        Err(e) => internal_error("Failed to rename item", e),
    }
}

/// Mark an item as the seed of a song. Promoting twice changes nothing.
pub async fn promote_item(
    Extension(database): Extension<Database>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let item = match database.get_item(id).await {
        Ok(Some(item)) => item,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Item not found"),
        Err(e) => return internal_error("Failed to load item", e),
    };

    if item.is_diagnostic() {
        return failure(StatusCode::BAD_REQUEST, "Diagnostic items cannot be promoted");
    }
    if item.title.starts_with(PROMOTED_PREFIX) {
        return Json(json!({ "success": true, "title": item.title })).into_response();
    }

    let title = format!("{PROMOTED_PREFIX}{}", item.title);
    match database.rename_item(id, &title).await {
        Ok(true) => Json(json!({ "success": true, "title": title })).into_response(),
        Ok(false) => failure(StatusCode::NOT_FOUND, "Item not found"),
        Err(e) => internal_error("Failed to promote item", e),
    }
}
