use super::{reconcile_recording, recording_placeholder, Outcome};
use crate::{database::Database, identity::Directory, transfer::MediaTransfer};
use anyhow::Result;
use axum::{extract::Request, response::IntoResponse, Extension};
use twilio::{Client as TwilioClient, RecordingState, RecordingStatus};

/// Twilio only needs an acknowledgment here, the work happens in the
/// background so the callback never times out during download retries.
pub async fn status_handler(
    twilio: Extension<TwilioClient>,
    database: Extension<Database>,
    transfer: Extension<MediaTransfer>,
    directory: Extension<Directory>,
    request: Request,
) -> impl IntoResponse {
    let status = match twilio.parse_request::<_, RecordingStatus>(request).await {
        Ok(status) => *status,
        Err(e) => {
            log::warn!("Rejected recording status callback: {e}");
            return "OK";
        }
    };

    log::info!(
        "Recording {} for call {} is {:?}",
        status.sid,
        status.call_sid,
        status.status
    );

    if status.status != RecordingState::InProgress {
        tokio::spawn(async move {
            let sid = status.sid.clone();
            if let Err(e) = reconcile_status(&database, &transfer, &twilio, &directory, status).await {
                log::error!("Failed to reconcile recording {sid}: {e:#}");
            }
        });
    }

    "OK"
}

/// Bring the inbox row of a recording in line with its final status.
pub(crate) async fn reconcile_status(
    database: &Database,
    transfer: &MediaTransfer,
    twilio: &TwilioClient,
    directory: &Directory,
    status: RecordingStatus,
) -> Result<()> {
    let (sender_name, sender_phone) = match database.get_item_by_recording_sid(&status.sid).await? {
        Some(item) => (item.sender_name, item.sender_phone),
        None => {
            let phone = caller_of(twilio, &status.call_sid).await;
            (directory.resolve(&phone), phone)
        }
    };

    let placeholder =
        recording_placeholder(database, &sender_name, &sender_phone, Some(&status.sid)).await?;

    match (status.status, status.url) {
        (RecordingState::Completed, Some(url)) => {
            match reconcile_recording(database, transfer, &placeholder, &url).await? {
                Outcome::Saved => log::info!("Recording {} stored from status callback", status.sid),
                Outcome::AlreadySaved => log::debug!("Recording {} was already stored", status.sid),
                Outcome::Failed(e) => log::warn!("Recording {} could not be stored: {e}", status.sid),
            }
        }
        (RecordingState::Completed, None) => {
            database
                .resolve_failure(
                    placeholder.id,
                    &format!("{sender_name} - Upload Failed"),
                    &format!("Recording {} completed without a media URL", status.sid),
                )
                .await?;
        }
        (RecordingState::Absent, _) => {
            database
                .resolve_failure(
                    placeholder.id,
                    &format!("{sender_name} - No Recording"),
                    &format!(
                        "Recording {} is absent, nothing was captured (duration: {}s)",
                        status.sid, status.duration
                    ),
                )
                .await?;
        }
        (RecordingState::Failed, _) => {
            database
                .resolve_failure(
                    placeholder.id,
                    &format!("{sender_name} - Recording Failed"),
                    &format!("Twilio reported recording {} as failed", status.sid),
                )
                .await?;
        }
        (RecordingState::InProgress, _) => {}
    }

    Ok(())
}

/// The status callback does not say who called; ask the call resource.
async fn caller_of(twilio: &TwilioClient, call_sid: &str) -> String {
    if call_sid.is_empty() || !twilio.has_credentials() {
        return String::new();
    }

    match twilio.fetch_call(call_sid).await {
        Ok(call) => call.from,
        Err(e) => {
            log::warn!("Could not look up caller of {call_sid}: {e}");
            String::new()
        }
    }
}
