use crate::{
    database::{ContentType, Database, InboxItem, NewItem},
    secrets::Secrets,
    transfer::{sanitize_filename, MediaTransfer, TransferError, TransferRequest},
    CONFIG,
};
use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use std::time::Duration;
use twilio::twiml::{Hangup, Record, Say, Twiml, Voice};

pub mod menu;
pub mod message;
pub mod recording;
pub mod status;
pub mod voice;

const PROCESSING_NOTE: &str = "Recording webhook received - processing...";

fn say(txt: &str) -> Say {
    Say {
        txt: txt.to_owned(),
        voice: Voice::Custom(CONFIG.settings.voice.to_owned()),
        language: CONFIG.settings.language.to_owned(),
    }
}

/// Say the text, then end the call.
fn say_and_hangup(txt: &str) -> Twiml {
    let mut twiml = Twiml::new();
    twiml.add(&say(txt)).add(&Hangup);
    twiml
}

/// Apology for a recording that could not be saved, optionally followed by
/// the transfer diagnostic.
pub(crate) fn apology_twiml(diagnostic: Option<&str>) -> Twiml {
    let mut twiml = Twiml::new();
    twiml.add(&say(CONFIG.texts.failed));
    if let Some(diagnostic) = diagnostic {
        twiml.add(&say(diagnostic));
    }
    twiml.add(&Hangup);
    twiml
}

/// The `<Record>` verb that captures a voice note and reports back to the
/// recording and status webhooks.
fn record_verb(secrets: &Secrets) -> Record {
    Record {
        action: Some(secrets.callback_url("/twilio/recording")),
        max_length: Some(CONFIG.settings.record_max_length as u32),
        timeout_seconds: Some(CONFIG.settings.record_timeout as u32),
        finish_on_key: Some(CONFIG.settings.record_finish_on_key.to_owned()),
        recording_status_callback: Some(secrets.callback_url("/twilio/recording-status")),
        ..Default::default()
    }
}

/// Wall clock time of day used in item titles.
fn clock(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M").to_string()
}

fn file_stamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y%m%d_%H%M%S").to_string()
}

fn url_expiry() -> Duration {
    Duration::from_secs(CONFIG.settings.url_expiry.max(1) as u64)
}

/// The kinds of media that end up in the inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Recording,
    VoiceMemo,
    Image,
    ImportedAudio,
    ImportedImage,
}

impl MediaKind {
    /// Classify a declared attachment type. `None` for anything that is
    /// neither audio nor an image.
    pub fn from_attachment(content_type: &str) -> Option<Self> {
        if content_type.starts_with("audio/") {
            Some(MediaKind::VoiceMemo)
        } else if content_type.starts_with("image/") {
            Some(MediaKind::Image)
        } else {
            None
        }
    }

    pub fn imported(content_type: &str) -> Option<Self> {
        match Self::from_attachment(content_type)? {
            MediaKind::Image => Some(MediaKind::ImportedImage),
            _ => Some(MediaKind::ImportedAudio),
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            MediaKind::Recording | MediaKind::VoiceMemo | MediaKind::ImportedAudio => ContentType::Voice,
            MediaKind::Image | MediaKind::ImportedImage => ContentType::Image,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MediaKind::Recording => "Voice",
            MediaKind::VoiceMemo => "Voice Memo",
            MediaKind::Image => "Image",
            MediaKind::ImportedAudio | MediaKind::ImportedImage => "Imported",
        }
    }

    pub fn title(&self, sender_name: &str, at: DateTime<Utc>) -> String {
        format!("{sender_name} - {} {}", self.label(), clock(at))
    }

    /// Content label of a stored item. Imports are deduplicated on it.
    pub fn content(&self, filename: &str) -> String {
        match self {
            MediaKind::Recording => format!("Voice recording - {filename}"),
            MediaKind::VoiceMemo => format!("Voice memo attachment - {filename}"),
            MediaKind::Image => format!("Image attachment - {filename}"),
            MediaKind::ImportedAudio | MediaKind::ImportedImage => format!("Imported - {filename}"),
        }
    }
}

/// How a media reconciliation ended.
#[derive(Debug)]
pub enum Outcome {
    Saved,
    /// Another delivery of the same recording already stored it.
    AlreadySaved,
    Failed(TransferError),
}

/// Media attached to an inbound event, waiting to be stored.
pub struct Capture<'a> {
    pub sender_name: &'a str,
    pub sender_phone: &'a str,
    pub kind: MediaKind,
    pub source_url: &'a str,
    pub content_type: &'a str,
    pub filename: String,
}

/// Record a placeholder for the media, then move it into storage and settle
/// the placeholder. Transfer failures become diagnostic items; only store
/// failures are returned as errors.
pub(crate) async fn capture_media(
    database: &Database,
    transfer: &MediaTransfer,
    capture: Capture<'_>,
) -> Result<(InboxItem, Outcome)> {
    let placeholder = database
        .insert_item(&NewItem::new(
            capture.sender_name,
            capture.sender_phone,
            capture.kind.content_type(),
            format!("{} - Processing {}", capture.sender_name, capture.kind.label()),
            capture.kind.content(&capture.filename),
        ))
        .await?;

    let outcome = settle(
        database,
        transfer,
        &placeholder,
        capture.kind,
        capture.source_url,
        capture.content_type,
        &capture.filename,
    )
    .await?;

    Ok((placeholder, outcome))
}

/// Write (or find) the placeholder row for a call recording. With a
/// recording SID the row is keyed on it, so every delivery for the same
/// recording lands on one row.
pub(crate) async fn recording_placeholder(
    database: &Database,
    sender_name: &str,
    sender_phone: &str,
    recording_sid: Option<&str>,
) -> Result<InboxItem> {
    let item = NewItem::new(
        sender_name,
        sender_phone,
        ContentType::Voice,
        format!("{sender_name} - Processing Recording"),
        PROCESSING_NOTE,
    );

    match recording_sid {
        Some(sid) => database.upsert_recording_placeholder(&item.with_recording_sid(sid)).await,
        None => database.insert_item(&item).await,
    }
}

/// Object name of a call recording. Derived from the row rather than the
/// clock, so concurrent deliveries write the same object.
fn recording_filename(item: &InboxItem) -> String {
    let sid = item.recording_sid.as_deref().unwrap_or("unknown");
    sanitize_filename(&format!(
        "call_recording_{}_{sid}.wav",
        file_stamp(item.created_at)
    ))
}

/// Store the recording behind `placeholder` unless it is already stored.
pub(crate) async fn reconcile_recording(
    database: &Database,
    transfer: &MediaTransfer,
    placeholder: &InboxItem,
    recording_url: &str,
) -> Result<Outcome> {
    if placeholder.media_reference.is_some() {
        log::debug!("Recording for item {} was already stored", placeholder.id);
        return Ok(Outcome::AlreadySaved);
    }

    let filename = recording_filename(placeholder);
    settle(
        database,
        transfer,
        placeholder,
        MediaKind::Recording,
        recording_url,
        "audio/wav",
        &filename,
    )
    .await
}

async fn settle(
    database: &Database,
    transfer: &MediaTransfer,
    placeholder: &InboxItem,
    kind: MediaKind,
    source_url: &str,
    content_type: &str,
    filename: &str,
) -> Result<Outcome> {
    let request = TransferRequest {
        source_url,
        filename,
        content_type,
        date_bucket: &placeholder.date_bucket,
        expiry: url_expiry(),
    };

    match transfer.transfer(&request).await {
        Ok(stored) => {
            database
                .resolve_success(
                    placeholder.id,
                    kind.content_type(),
                    &kind.title(&placeholder.sender_name, Utc::now()),
                    &kind.content(filename),
                    &stored.url,
                )
                .await?;
            log::info!(
                "{} from {} stored as {}",
                kind.label(),
                placeholder.sender_name,
                stored.key
            );
            Ok(Outcome::Saved)
        }
        Err(e) => {
            log::error!("Failed to store media for item {}: {e}", placeholder.id);
            let changed = database
                .resolve_failure(
                    placeholder.id,
                    &format!("{} - Upload Failed", placeholder.sender_name),
                    &e.to_string(),
                )
                .await?;
            if !changed {
                // A concurrent delivery stored the media in the meantime
                return Ok(Outcome::AlreadySaved);
            }
            Ok(Outcome::Failed(e))
        }
    }
}
