use super::{record_verb, say, say_and_hangup};
use crate::{secrets::Secrets, CONFIG};
use axum::{extract::Request, response::IntoResponse, Extension};
use twilio::{
    twiml::{Gather, Prompt, Twiml},
    Call, Client as TwilioClient,
};

pub async fn menu_handler(
    twilio: Extension<TwilioClient>,
    secrets: Extension<Secrets>,
    request: Request,
) -> impl IntoResponse {
    twilio
        .clone()
        .respond_to_webhook_async(request, options_twiml(&secrets), |call: Call| async move {
            log::debug!("Menu choice {:?} on call {}", call.digits, call.sid);

            match call.digits.as_deref() {
                Some("1") => record_again(&secrets, CONFIG.texts.menu_new_note),
                Some("2") => {
                    let mut twiml = Twiml::new();
                    twiml
                        .add(&say(CONFIG.texts.menu_pause))
                        .add(&gather(CONFIG.texts.menu_prompt, &secrets));
                    twiml
                }
                Some("3") => record_again(&secrets, CONFIG.texts.menu_restart),
                Some("4") => say_and_hangup(CONFIG.texts.menu_save),
                _ => options_twiml(&secrets),
            }
        })
        .await
}

/// Collect a single key press and post it back to the menu.
fn gather(prompt: &str, secrets: &Secrets) -> Gather {
    Gather {
        action: Some(secrets.callback_url("/twilio/menu")),
        num_digits: Some(1),
        timeout_seconds: CONFIG.settings.menu_timeout as u32,
        prompt: Prompt::Say(say(prompt)),
        ..Default::default()
    }
}

fn record_again(secrets: &Secrets, announcement: &str) -> Twiml {
    let mut twiml = Twiml::new();
    twiml
        .add(&say(announcement))
        .add(&record_verb(secrets))
        .add(&gather(CONFIG.texts.menu_prompt, secrets));
    twiml
}

fn options_twiml(secrets: &Secrets) -> Twiml {
    let mut twiml = Twiml::new();
    twiml
        .add(&say(CONFIG.texts.menu_options))
        .add(&gather(CONFIG.texts.menu_prompt, secrets));
    twiml
}
