use crate::api::songs::SaveSongArgs;
use anyhow::{bail, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    FromRow, Sqlite, SqlitePool, Transaction,
};
use std::{collections::HashMap, str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database at the given URL, creating the file and
    /// applying pending migrations when needed.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Inserts a new inbox item and returns it with its assigned ID.
    pub async fn insert_item(&self, item: &NewItem) -> Result<InboxItem> {
        Ok(sqlx::query_as::<_, InboxItem>(
            r#"
                INSERT INTO inbox (
                    sender_name,
                    sender_phone,
                    content_type,
                    title,
                    content,
                    media_reference,
                    recording_sid,
                    date_bucket,
                    created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING *
            "#,
        )
        .bind(&item.sender_name)
        .bind(&item.sender_phone)
        .bind(item.content_type.as_str())
        .bind(&item.title)
        .bind(&item.content)
        .bind(&item.media_reference)
        .bind(&item.recording_sid)
        .bind(&item.date_bucket)
        .bind(item.created_at)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Inserts the placeholder for a provider recording, or returns the
    /// existing row when the recording was already seen. The existing row
    /// keeps its content; it only picks up the caller when it had none.
    pub async fn upsert_recording_placeholder(&self, item: &NewItem) -> Result<InboxItem> {
        if item.recording_sid.is_none() {
            bail!("recording placeholder without a recording SID");
        }

        Ok(sqlx::query_as::<_, InboxItem>(
            r#"
                INSERT INTO inbox (
                    sender_name,
                    sender_phone,
                    content_type,
                    title,
                    content,
                    media_reference,
                    recording_sid,
                    date_bucket,
                    created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (recording_sid) WHERE recording_sid IS NOT NULL DO UPDATE
                SET sender_name = CASE
                        WHEN inbox.sender_phone = '' AND excluded.sender_phone != ''
                            THEN excluded.sender_name
                        ELSE inbox.sender_name
                    END,
                    sender_phone = CASE
                        WHEN inbox.sender_phone = '' AND excluded.sender_phone != ''
                            THEN excluded.sender_phone
                        ELSE inbox.sender_phone
                    END,
                    -- titles start with the sender name, swap it for the filled one
                    title = CASE
                        WHEN inbox.sender_phone = '' AND excluded.sender_phone != ''
                            AND substr(inbox.title, 1, length(inbox.sender_name)) = inbox.sender_name
                            THEN excluded.sender_name || substr(inbox.title, length(inbox.sender_name) + 1)
                        ELSE inbox.title
                    END
                RETURNING *
            "#,
        )
        .bind(&item.sender_name)
        .bind(&item.sender_phone)
        .bind(item.content_type.as_str())
        .bind(&item.title)
        .bind(&item.content)
        .bind(&item.media_reference)
        .bind(&item.recording_sid)
        .bind(&item.date_bucket)
        .bind(item.created_at)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Marks an item as successfully reconciled with its stored media.
    pub async fn resolve_success(
        &self,
        id: i64,
        content_type: ContentType,
        title: &str,
        content: &str,
        media_reference: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
                UPDATE inbox
                SET content_type = ?, title = ?, content = ?, media_reference = ?
                WHERE id = ?
            "#,
        )
        .bind(content_type.as_str())
        .bind(title)
        .bind(content)
        .bind(media_reference)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Turns an item into a diagnostic record. Items that already carry a
    /// media reference are left untouched; returns whether the row changed.
    pub async fn resolve_failure(&self, id: i64, title: &str, diagnostic: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
                UPDATE inbox
                SET content_type = 'error', title = ?, content = ?
                WHERE id = ? AND media_reference IS NULL
            "#,
        )
        .bind(title)
        .bind(diagnostic)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Rewrites title and content of an item that has not received media.
    pub async fn annotate_unresolved(&self, id: i64, title: &str, content: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
                UPDATE inbox
                SET title = ?, content = ?
                WHERE id = ? AND media_reference IS NULL
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the media reference with a freshly signed URL. Only applies
    /// to items that already have one.
    pub async fn refresh_media_reference(&self, id: i64, media_reference: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
                UPDATE inbox
                SET media_reference = ?
                WHERE id = ? AND media_reference IS NOT NULL
            "#,
        )
        .bind(media_reference)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_item(&self, id: i64) -> Result<Option<InboxItem>> {
        Ok(sqlx::query_as::<_, InboxItem>("SELECT * FROM inbox WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get_item_by_recording_sid(&self, recording_sid: &str) -> Result<Option<InboxItem>> {
        Ok(
            sqlx::query_as::<_, InboxItem>("SELECT * FROM inbox WHERE recording_sid = ?")
                .bind(recording_sid)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Gets all inbox items ordered by sender, then newest day and newest
    /// item first.
    pub async fn list_items(&self) -> Result<Vec<InboxItem>> {
        Ok(sqlx::query_as::<_, InboxItem>(
            r#"
                SELECT * FROM inbox
                ORDER BY sender_name ASC, date_bucket DESC, created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    /// Whether any item already has exactly this content label.
    pub async fn content_exists(&self, content: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inbox WHERE content = ?")
            .bind(content)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    pub async fn rename_item(&self, id: i64, title: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE inbox SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_item(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM inbox WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Gets all songs, newest first, with their media in order.
    pub async fn list_songs(&self) -> Result<Vec<Song>> {
        let mut songs = sqlx::query_as::<_, Song>(
            "SELECT id, title, lyrics, notes, source, created_at FROM songs ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let media = sqlx::query_as::<_, SongMedia>(
            "SELECT song_id, kind, reference FROM song_media ORDER BY song_id, kind, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_song: HashMap<i64, Vec<SongMedia>> = HashMap::new();
        for entry in media {
            by_song.entry(entry.song_id).or_default().push(entry);
        }

        for song in songs.iter_mut() {
            for entry in by_song.remove(&song.id).unwrap_or_default() {
                match entry.kind.as_str() {
                    "audio" => song.audio_files.push(entry.reference),
                    _ => song.voice_notes.push(entry.reference),
                }
            }
        }

        Ok(songs)
    }

    /// Creates a song, or replaces an existing one when an ID is given.
    /// Returns `None` if the given ID does not exist.
    pub async fn save_song(&self, song: &SaveSongArgs) -> Result<Option<i64>> {
        let mut tx = self.pool.begin().await?;

        let id = match song.id {
            Some(id) => {
                let updated = sqlx::query(
                    r#"
                        UPDATE songs
                        SET title = ?, lyrics = ?, notes = ?, source = ?
                        WHERE id = ?
                    "#,
                )
                .bind(&song.title)
                .bind(&song.lyrics)
                .bind(&song.notes)
                .bind(&song.source)
                .bind(id)
                .execute(&mut *tx)
                .await?;

                if updated.rows_affected() == 0 {
                    return Ok(None);
                }

                sqlx::query("DELETE FROM song_media WHERE song_id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;

                id
            }
            None => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                        INSERT INTO songs (title, lyrics, notes, source, created_at)
                        VALUES (?, ?, ?, ?, ?)
                        RETURNING id
                    "#,
                )
                .bind(&song.title)
                .bind(&song.lyrics)
                .bind(&song.notes)
                .bind(&song.source)
                .bind(Utc::now())
                .fetch_one(&mut *tx)
                .await?
            }
        };

        append_song_media(&mut tx, id, SongMediaKind::Audio, &song.audio_files).await?;
        append_song_media(&mut tx, id, SongMediaKind::VoiceNote, &song.voice_notes).await?;

        tx.commit().await?;
        Ok(Some(id))
    }

    /// Appends the media of `source_id` to `target_id`, keeping the order of
    /// both. Returns `false` if either song does not exist.
    pub async fn merge_songs(&self, source_id: i64, target_id: i64, delete_source: bool) -> Result<bool> {
        if source_id == target_id {
            bail!("cannot merge song {source_id} into itself");
        }

        let mut tx = self.pool.begin().await?;

        let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE id IN (?, ?)")
            .bind(source_id)
            .bind(target_id)
            .fetch_one(&mut *tx)
            .await?;
        if found != 2 {
            return Ok(false);
        }

        for kind in [SongMediaKind::Audio, SongMediaKind::VoiceNote] {
            let offset: i64 = sqlx::query_scalar(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM song_media WHERE song_id = ? AND kind = ?",
            )
            .bind(target_id)
            .bind(kind.as_str())
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                    INSERT INTO song_media (song_id, kind, position, reference)
                    SELECT ?, kind, position + ?, reference
                    FROM song_media
                    WHERE song_id = ? AND kind = ?
                "#,
            )
            .bind(target_id)
            .bind(offset)
            .bind(source_id)
            .bind(kind.as_str())
            .execute(&mut *tx)
            .await?;
        }

        if delete_source {
            sqlx::query("DELETE FROM song_media WHERE song_id = ?")
                .bind(source_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM songs WHERE id = ?")
                .bind(source_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn delete_song(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM song_media WHERE song_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM songs WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn append_song_media(
    tx: &mut Transaction<'_, Sqlite>,
    song_id: i64,
    kind: SongMediaKind,
    references: &[String],
) -> Result<()> {
    for (position, reference) in references.iter().enumerate() {
        sqlx::query(
            "INSERT INTO song_media (song_id, kind, position, reference) VALUES (?, ?, ?, ?)",
        )
        .bind(song_id)
        .bind(kind.as_str())
        .bind(position as i64)
        .bind(reference)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Voice,
    Text,
    Image,
    /// Diagnostic record, not user content.
    #[serde(rename = "error")]
    Diagnostic,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Voice => "voice",
            ContentType::Text => "text",
            ContentType::Image => "image",
            ContentType::Diagnostic => "error",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown content type {0:?}")]
pub struct UnknownContentType(String);

impl TryFrom<String> for ContentType {
    type Error = UnknownContentType;

    fn try_from(value: String) -> Result<Self, UnknownContentType> {
        match value.as_str() {
            "voice" => Ok(ContentType::Voice),
            "text" => Ok(ContentType::Text),
            "image" => Ok(ContentType::Image),
            "error" => Ok(ContentType::Diagnostic),
            _ => Err(UnknownContentType(value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InboxItem {
    pub id: i64,
    pub sender_name: String,
    pub sender_phone: String,
    #[sqlx(try_from = "String")]
    pub content_type: ContentType,
    pub title: String,
    pub content: String,
    pub media_reference: Option<String>,
    pub recording_sid: Option<String>,
    pub date_bucket: String,
    pub created_at: DateTime<Utc>,
}

impl InboxItem {
    pub fn is_diagnostic(&self) -> bool {
        self.content_type == ContentType::Diagnostic
    }
}

/// An inbox item before insertion, stamped with the current time.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub sender_name: String,
    pub sender_phone: String,
    pub content_type: ContentType,
    pub title: String,
    pub content: String,
    pub media_reference: Option<String>,
    pub recording_sid: Option<String>,
    pub date_bucket: String,
    pub created_at: DateTime<Utc>,
}

impl NewItem {
    pub fn new(
        sender_name: &str,
        sender_phone: &str,
        content_type: ContentType,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            sender_name: sender_name.to_string(),
            sender_phone: sender_phone.to_string(),
            content_type,
            title: title.into(),
            content: content.into(),
            media_reference: None,
            recording_sid: None,
            date_bucket: date_bucket(created_at),
            created_at,
        }
    }

    pub fn with_recording_sid(mut self, recording_sid: &str) -> Self {
        self.recording_sid = Some(recording_sid.to_string());
        self
    }
}

/// Calendar day of the server's local time, `YYYY-MM-DD`.
pub fn date_bucket(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub lyrics: String,
    pub notes: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub audio_files: Vec<String>,
    #[sqlx(skip)]
    pub voice_notes: Vec<String>,
}

#[derive(Debug, Clone, FromRow)]
struct SongMedia {
    song_id: i64,
    kind: String,
    reference: String,
}

#[derive(Debug, Clone, Copy)]
enum SongMediaKind {
    Audio,
    VoiceNote,
}

impl SongMediaKind {
    fn as_str(&self) -> &'static str {
        match self {
            SongMediaKind::Audio => "audio",
            SongMediaKind::VoiceNote => "voice_note",
        }
    }
}

#[cfg(test)]
impl Database {
    /// A fresh, migrated in-memory database. A single connection keeps every
    /// query on the same memory database.
    pub async fn in_memory() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        Self { pool }
    }

    /// Run raw SQL against the test database, e.g. to install failure triggers.
    pub async fn run_sql(&self, sql: &str) {
        sqlx::raw_sql(sql).execute(&self.pool).await.unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice_placeholder(sid: &str) -> NewItem {
        NewItem::new(
            "Asia",
            "+16783614280",
            ContentType::Voice,
            "Asia - Processing Recording",
            "Recording webhook received - processing...",
        )
        .with_recording_sid(sid)
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_stamps() {
        let database = Database::in_memory().await;

        let first = database
            .insert_item(&NewItem::new("Asia", "+16783614280", ContentType::Text, "Asia - 10:00", "hook idea"))
            .await
            .unwrap();
        let second = database
            .insert_item(&NewItem::new("Asia", "+16783614280", ContentType::Text, "Asia - 10:01", "verse idea"))
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.content_type, ContentType::Text);
        assert_eq!(first.date_bucket, date_bucket(first.created_at));
        assert!(first.media_reference.is_none());
    }

    #[tokio::test]
    async fn recording_placeholder_is_keyed_by_sid() {
        let database = Database::in_memory().await;

        let first = database
            .upsert_recording_placeholder(&voice_placeholder("RE1"))
            .await
            .unwrap();
        let again = database
            .upsert_recording_placeholder(&voice_placeholder("RE1"))
            .await
            .unwrap();
        let other = database
            .upsert_recording_placeholder(&voice_placeholder("RE2"))
            .await
            .unwrap();

        assert_eq!(first.id, again.id);
        assert_ne!(first.id, other.id);
        assert_eq!(database.list_items().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn placeholder_upsert_fills_missing_sender() {
        let database = Database::in_memory().await;

        let anonymous = NewItem::new(
            "Unknown Caller",
            "",
            ContentType::Voice,
            "Unknown Caller - Processing Recording",
            "...",
        )
        .with_recording_sid("RE1");
        let first = database.upsert_recording_placeholder(&anonymous).await.unwrap();
        database
            .resolve_success(first.id, ContentType::Voice, "Unknown Caller - Voice 10:00", "Voice recording - a.wav", "https://bucket/a.wav")
            .await
            .unwrap();

        let item = database
            .upsert_recording_placeholder(&voice_placeholder("RE1"))
            .await
            .unwrap();
        assert_eq!(item.sender_name, "Asia");
        assert_eq!(item.sender_phone, "+16783614280");
        assert_eq!(item.title, "Asia - Voice 10:00");

        // a second anonymous delivery changes nothing
        let again = database.upsert_recording_placeholder(&anonymous).await.unwrap();
        assert_eq!(again.sender_name, "Asia");
        assert_eq!(again.title, "Asia - Voice 10:00");
    }

    #[tokio::test]
    async fn failure_never_drops_media_reference() {
        let database = Database::in_memory().await;
        let item = database
            .upsert_recording_placeholder(&voice_placeholder("RE1"))
            .await
            .unwrap();

        database
            .resolve_success(item.id, ContentType::Voice, "Asia - Voice 10:00", "Voice recording - a.wav", "https://bucket/a.wav")
            .await
            .unwrap();

        let changed = database
            .resolve_failure(item.id, "Asia - Upload Failed", "download failed")
            .await
            .unwrap();
        assert!(!changed);

        let stored = database.get_item(item.id).await.unwrap().unwrap();
        assert_eq!(stored.content_type, ContentType::Voice);
        assert_eq!(stored.media_reference.as_deref(), Some("https://bucket/a.wav"));
    }

    #[tokio::test]
    async fn failure_marks_item_diagnostic() {
        let database = Database::in_memory().await;
        let item = database
            .upsert_recording_placeholder(&voice_placeholder("RE1"))
            .await
            .unwrap();

        assert!(database
            .resolve_failure(item.id, "Asia - Upload Failed", "upload rejected")
            .await
            .unwrap());

        let stored = database.get_item(item.id).await.unwrap().unwrap();
        assert!(stored.is_diagnostic());
        assert_eq!(stored.content, "upload rejected");
    }

    #[tokio::test]
    async fn refresh_requires_existing_reference() {
        let database = Database::in_memory().await;
        let item = database
            .insert_item(&NewItem::new("Asia", "", ContentType::Text, "t", "c"))
            .await
            .unwrap();

        assert!(!database.refresh_media_reference(item.id, "https://new").await.unwrap());
        assert!(database
            .get_item(item.id)
            .await
            .unwrap()
            .unwrap()
            .media_reference
            .is_none());
    }

    #[tokio::test]
    async fn rename_and_delete_report_missing_rows() {
        let database = Database::in_memory().await;
        let item = database
            .insert_item(&NewItem::new("Asia", "", ContentType::Text, "t", "c"))
            .await
            .unwrap();

        assert!(database.rename_item(item.id, "Chorus").await.unwrap());
        assert!(!database.rename_item(item.id + 1, "Chorus").await.unwrap());
        assert!(database.delete_item(item.id).await.unwrap());
        assert!(!database.delete_item(item.id).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_writers_get_unique_rows() {
        let path = std::env::temp_dir().join(format!(
            "songbox-concurrency-{}-{}.db",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let database = Database::connect(&format!("sqlite://{}", path.display()))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let database = database.clone();
            tasks.push(tokio::spawn(async move {
                let text = NewItem::new("Asia", "", ContentType::Text, format!("t{i}"), "c");
                let inserted = database.insert_item(&text).await.unwrap();
                let placeholder = database
                    .upsert_recording_placeholder(&voice_placeholder("RE-shared"))
                    .await
                    .unwrap();
                (inserted.id, placeholder.id)
            }));
        }

        let mut text_ids = Vec::new();
        let mut placeholder_ids = Vec::new();
        for task in tasks {
            let (text_id, placeholder_id) = task.await.unwrap();
            text_ids.push(text_id);
            placeholder_ids.push(placeholder_id);
        }

        text_ids.sort();
        text_ids.dedup();
        placeholder_ids.dedup();
        assert_eq!(text_ids.len(), 20);
        assert_eq!(placeholder_ids.len(), 1);
        assert_eq!(database.list_items().await.unwrap().len(), 21);

        let _ = std::fs::remove_file(&path);
    }

    fn song(title: &str, audio: &[&str], voice: &[&str]) -> SaveSongArgs {
        SaveSongArgs {
            id: None,
            title: title.to_string(),
            lyrics: String::new(),
            notes: String::new(),
            source: String::new(),
            audio_files: audio.iter().map(|s| s.to_string()).collect(),
            voice_notes: voice.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn merge_appends_media_in_order() {
        let database = Database::in_memory().await;
        let target = database
            .save_song(&song("Target", &["a1", "a2"], &["v1"]))
            .await
            .unwrap()
            .unwrap();
        let source = database
            .save_song(&song("Source", &["a3"], &["v2", "v3"]))
            .await
            .unwrap()
            .unwrap();

        assert!(database.merge_songs(source, target, true).await.unwrap());

        let songs = database.list_songs().await.unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].audio_files, vec!["a1", "a2", "a3"]);
        assert_eq!(songs[0].voice_notes, vec!["v1", "v2", "v3"]);
    }

    #[tokio::test]
    async fn save_with_id_replaces_media() {
        let database = Database::in_memory().await;
        let id = database
            .save_song(&song("Draft", &["a1", "a2"], &[]))
            .await
            .unwrap()
            .unwrap();

        let mut update = song("Final", &["a2"], &["v1"]);
        update.id = Some(id);
        assert_eq!(database.save_song(&update).await.unwrap(), Some(id));

        update.id = Some(id + 100);
        assert_eq!(database.save_song(&update).await.unwrap(), None);

        let songs = database.list_songs().await.unwrap();
        assert_eq!(songs[0].title, "Final");
        assert_eq!(songs[0].audio_files, vec!["a2"]);
        assert_eq!(songs[0].voice_notes, vec!["v1"]);
    }
}
