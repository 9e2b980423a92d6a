use super::{apology_twiml, clock, reconcile_recording, recording_placeholder, say_and_hangup, Outcome};
use crate::{database::Database, identity::Directory, transfer::MediaTransfer, CONFIG};
use anyhow::Result;
use axum::{extract::Request, response::IntoResponse, Extension};
use chrono::Utc;
use twilio::{twiml::Twiml, Client as TwilioClient, Recording};

pub async fn recording_handler(
    twilio: Extension<TwilioClient>,
    database: Extension<Database>,
    transfer: Extension<MediaTransfer>,
    directory: Extension<Directory>,
    request: Request,
) -> impl IntoResponse {
    twilio
        .clone()
        .respond_to_webhook_async(request, apology_twiml(None), |recording: Recording| async move {
            log::debug!(
                "Received recording for call {} with id {:?}",
                recording.call_sid,
                recording.sid
            );

            match handle_recording(&database, &transfer, &directory, recording).await {
                Ok(twiml) => twiml,
                Err(e) => {
                    log::error!("Failed to process recording webhook: {e:#}");
                    apology_twiml(None)
                }
            }
        })
        .await
}

async fn handle_recording(
    database: &Database,
    transfer: &MediaTransfer,
    directory: &Directory,
    recording: Recording,
) -> Result<Twiml> {
    let sender_name = directory.resolve(&recording.from);

    // Record that the webhook arrived before anything can fail
    let placeholder = recording_placeholder(
        database,
        &sender_name,
        &recording.from,
        recording.sid.as_deref(),
    )
    .await?;

    match (recording.url, recording.sid) {
        // Too short or silent, Twilio discarded it
        (None, _) => {
            log::warn!(
                "No recording captured for call {} ({}s)",
                recording.call_sid,
                recording.duration
            );
            database
                .annotate_unresolved(
                    placeholder.id,
                    &format!("{sender_name} - No Recording ({})", clock(Utc::now())),
                    &format!(
                        "Call received but no recording captured (duration: {}s)",
                        recording.duration
                    ),
                )
                .await?;
            Ok(say_and_hangup(CONFIG.texts.too_short))
        }
        (Some(url), None) => {
            log::warn!("Recording for call {} has a URL but no id", recording.call_sid);
            database
                .resolve_failure(
                    placeholder.id,
                    &format!("{sender_name} - Recording Incomplete"),
                    &format!("Recording callback carried a URL but no recording id ({url})"),
                )
                .await?;
            Ok(say_and_hangup(CONFIG.texts.incomplete))
        }
        (Some(url), Some(_)) => match reconcile_recording(database, transfer, &placeholder, &url).await? {
            Outcome::Saved | Outcome::AlreadySaved => Ok(say_and_hangup(CONFIG.texts.saved)),
            Outcome::Failed(e) => {
                let diagnostic = e.to_string();
                Ok(apology_twiml(
                    CONFIG.settings.speak_diagnostics.then_some(diagnostic.as_str()),
                ))
            }
        },
    }
}
