use super::{record_verb, say, say_and_hangup};
use crate::{secrets::Secrets, transfer::MediaTransfer, CONFIG};
use axum::{extract::Request, response::IntoResponse, Extension};
use twilio::{twiml::Twiml, Call, Client as TwilioClient};

pub async fn voice_handler(
    twilio: Extension<TwilioClient>,
    transfer: Extension<MediaTransfer>,
    secrets: Extension<Secrets>,
    request: Request,
) -> impl IntoResponse {
    twilio
        .clone()
        .respond_to_webhook_async(
            request,
            say_and_hangup(CONFIG.texts.unavailable),
            |call: Call| async move {
                log::debug!("Received call from {} with id {}", call.from, call.sid);

                // Refuse to record when the voice note could not be stored
                if !transfer.is_ready() {
                    log::error!(
                        "Answering call {} as unavailable, telephony configured: {}, storage configured: {}",
                        call.sid,
                        transfer.source_configured(),
                        transfer.store_configured()
                    );
                    return say_and_hangup(CONFIG.texts.unavailable);
                }

                generate_record_twiml(&secrets)
            },
        )
        .await
}

/// 1. Greet the caller
/// 2. Record until the finish key, silence or the length limit
fn generate_record_twiml(secrets: &Secrets) -> Twiml {
    let mut twiml = Twiml::new();
    twiml.add(&say(CONFIG.texts.welcome)).add(&record_verb(secrets));
    twiml
}

#[cfg(test)]
mod tests {
    use crate::{
        app,
        transfer::testing::{FakeSource, FakeStore},
        webhook::tests::{fast_transfer, form_request},
    };
    use axum::body::to_bytes;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn call() -> Vec<(&'static str, &'static str)> {
        vec![
            ("CallSid", "CA100"),
            ("From", "+16783614280"),
            ("To", "+17707582471"),
            ("CallStatus", "ringing"),
        ]
    }

    async fn respond(store: FakeStore) -> String {
        let transfer = fast_transfer(Arc::new(FakeSource::ready(vec![0; 2048])), Arc::new(store));
        let (router, _) = app::test_app(transfer).await;
        let response = router
            .oneshot(form_request("/twilio/voice", &call()))
            .await
            .unwrap();
        assert!(response.status().is_success());
        String::from_utf8(to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn greets_and_records() {
        let twiml = respond(FakeStore::new()).await;

        assert!(twiml.contains("Lady Ember Songs"));
        assert!(twiml.contains("<Record action=\"/twilio/recording\""));
        assert!(twiml.contains("maxLength=\"300\""));
        assert!(twiml.contains("finishOnKey=\"1\""));
        assert!(twiml.contains("recordingStatusCallback=\"/twilio/recording-status\""));
    }

    #[tokio::test]
    async fn unavailable_without_storage() {
        let twiml = respond(FakeStore::unconfigured()).await;

        assert!(twiml.contains("unavailable"));
        assert!(twiml.contains("<Hangup/>"));
        assert!(!twiml.contains("<Record"));
    }
}
