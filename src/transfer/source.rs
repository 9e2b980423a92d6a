use super::{FetchError, MediaSource};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use twilio::{Client as TwilioClient, TwilioError};

/// Downloads recordings and message attachments from Twilio with the
/// account's basic auth credentials.
#[derive(Clone)]
pub struct TwilioSource {
    twilio: TwilioClient,
    timeout: Duration,
}

impl TwilioSource {
    pub fn new(twilio: TwilioClient, timeout: Duration) -> Self {
        Self { twilio, timeout }
    }
}

#[async_trait]
impl MediaSource for TwilioSource {
    fn is_configured(&self) -> bool {
        self.twilio.has_credentials()
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        match self.twilio.download_media(url, self.timeout).await {
            Ok(body) => Ok(body),
            // Recordings 404 until Twilio has finished processing them
            Err(TwilioError::HTTPError(status)) if status == StatusCode::NOT_FOUND => {
                Err(FetchError::NotReady)
            }
            Err(TwilioError::MissingCredentials) => Err(FetchError::NotConfigured),
            Err(e) => Err(FetchError::Failed(e.to_string())),
        }
    }
}
