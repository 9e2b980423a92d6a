use crate::CONFIG;
use std::env::var;

/// Credentials and deployment specific values, read from the environment.
///
/// Provider and storage credentials are optional: a missing credential only
/// fails the requests that need it, the server itself still starts.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub database_url: String,
    pub public_url: String,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_validate_signatures: bool,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_bucket_name: String,
    pub aws_region: String,
    pub aws_endpoint_url: Option<String>,
    pub sender_directory: Option<String>,
}

fn optional(key: &str) -> Option<String> {
    var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            database_url: optional("DATABASE_URL").unwrap_or_else(|| "sqlite://songs.db".to_string()),
            public_url: optional("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            twilio_account_sid: optional("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: optional("TWILIO_AUTH_TOKEN"),
            twilio_validate_signatures: optional("TWILIO_VALIDATE_SIGNATURES")
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
            aws_access_key_id: optional("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: optional("AWS_SECRET_ACCESS_KEY"),
            aws_bucket_name: optional("AWS_BUCKET_NAME")
                .unwrap_or_else(|| CONFIG.settings.default_bucket.to_string()),
            aws_region: optional("AWS_REGION")
                .unwrap_or_else(|| CONFIG.settings.default_region.to_string()),
            aws_endpoint_url: optional("AWS_ENDPOINT_URL"),
            sender_directory: optional("SENDER_DIRECTORY"),
        }
    }

    /// Absolute callback URL for a webhook path, or the bare path when no
    /// public URL is configured (TwiML resolves it against the request URL).
    pub fn callback_url(&self, path: &str) -> String {
        format!("{}{}", self.public_url, path)
    }
}

#[cfg(test)]
impl Secrets {
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            public_url: String::new(),
            twilio_account_sid: Some("AC123".to_string()),
            twilio_auth_token: Some("secret".to_string()),
            twilio_validate_signatures: false,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_bucket_name: "songs-test".to_string(),
            aws_region: "us-east-1".to_string(),
            aws_endpoint_url: None,
            sender_directory: None,
        }
    }
}
