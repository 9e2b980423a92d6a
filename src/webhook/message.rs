use super::{capture_media, clock, file_stamp, Capture, MediaKind, Outcome};
use crate::{
    database::{ContentType, Database, NewItem},
    identity::Directory,
    transfer::{sanitize_filename, MediaTransfer},
    CONFIG,
};
use anyhow::Result;
use axum::{extract::Request, response::IntoResponse, Extension};
use chrono::Utc;
use twilio::{
    twiml::{Message as Reply, Twiml},
    Client as TwilioClient, MediaAttachment, Message,
};

/// What happened to the parts of one inbound message.
#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    saved: usize,
    failed: usize,
}

pub async fn message_handler(
    twilio: Extension<TwilioClient>,
    database: Extension<Database>,
    transfer: Extension<MediaTransfer>,
    directory: Extension<Directory>,
    request: Request,
) -> impl IntoResponse {
    twilio
        .clone()
        .respond_to_webhook_async(request, reply(CONFIG.texts.message_failed), |message: Message| async move {
            log::debug!(
                "Received message {} from {} with {} attachments",
                message.sid,
                message.from,
                message.media.len()
            );

            match handle_message(&database, &transfer, &directory, message).await {
                Ok(tally) if tally.failed > 0 => reply(CONFIG.texts.message_partial),
                Ok(_) => reply(CONFIG.texts.message_saved),
                Err(e) => {
                    log::error!("Failed to process message: {e:#}");
                    reply(CONFIG.texts.message_failed)
                }
            }
        })
        .await
}

fn reply(txt: &str) -> Twiml {
    let mut twiml = Twiml::new();
    twiml.add(&Reply::new(txt));
    twiml
}

async fn handle_message(
    database: &Database,
    transfer: &MediaTransfer,
    directory: &Directory,
    message: Message,
) -> Result<Tally> {
    let sender_name = directory.resolve(&message.from);
    let stamp = file_stamp(Utc::now());
    let mut tally = Tally::default();

    // The body does not wait on attachment downloads
    if !message.body.trim().is_empty() {
        database
            .insert_item(&NewItem::new(
                &sender_name,
                &message.from,
                ContentType::Text,
                format!("{sender_name} - {}", clock(Utc::now())),
                message.body.as_str(),
            ))
            .await?;
        tally.saved += 1;
        log::info!("Text message from {sender_name} saved");
    }

    for (i, attachment) in message.media.iter().enumerate() {
        match store_attachment(database, transfer, &sender_name, &message, &stamp, i, attachment).await {
            Ok(true) => tally.saved += 1,
            Ok(false) => tally.failed += 1,
            Err(e) => {
                log::error!("Failed to record attachment {i} of message {}: {e:#}", message.sid);
                tally.failed += 1;
            }
        }
    }

    if tally == Tally::default() {
        database
            .insert_item(&NewItem::new(
                &sender_name,
                &message.from,
                ContentType::Diagnostic,
                format!("{sender_name} - Empty Message"),
                "Message received with no text and no attachments",
            ))
            .await?;
    }

    Ok(tally)
}

/// Store one attachment. `Ok(false)` when it was recorded as a diagnostic
/// instead of media.
async fn store_attachment(
    database: &Database,
    transfer: &MediaTransfer,
    sender_name: &str,
    message: &Message,
    stamp: &str,
    index: usize,
    attachment: &MediaAttachment,
) -> Result<bool> {
    if attachment.url.is_empty() {
        log::warn!("Attachment {index} of message {} has no URL", message.sid);
        database
            .insert_item(&NewItem::new(
                sender_name,
                &message.from,
                ContentType::Diagnostic,
                format!("{sender_name} - Missing Attachment"),
                format!(
                    "Attachment {index} of type {} arrived without a URL",
                    attachment.content_type
                ),
            ))
            .await?;
        return Ok(false);
    }

    let Some(kind) = MediaKind::from_attachment(&attachment.content_type) else {
        let declared = match attachment.content_type.as_str() {
            "" => "unknown",
            other => other,
        };
        log::warn!("Unsupported attachment {declared} from {sender_name}");
        database
            .insert_item(&NewItem::new(
                sender_name,
                &message.from,
                ContentType::Diagnostic,
                format!("{sender_name} - Unsupported Attachment"),
                format!("Attachment of type {declared} was not saved ({})", attachment.url),
            ))
            .await?;
        return Ok(false);
    };

    let prefix = match kind {
        MediaKind::Image => "image",
        _ => "voice_memo",
    };
    let extension = attachment
        .content_type
        .split(';')
        .next()
        .and_then(|t| t.rsplit('/').next())
        .unwrap_or("bin");
    let filename = sanitize_filename(&format!(
        "{prefix}_{stamp}_{}_{index}.{extension}",
        message.sid
    ));

    let (_, outcome) = capture_media(
        database,
        transfer,
        Capture {
            sender_name,
            sender_phone: &message.from,
            kind,
            source_url: &attachment.url,
            content_type: &attachment.content_type,
            filename,
        },
    )
    .await?;

    Ok(!matches!(outcome, Outcome::Failed(_)))
}
