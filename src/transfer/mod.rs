use crate::CONFIG;
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;

mod source;
mod storage;
#[cfg(test)]
pub mod testing;

pub use source::TwilioSource;
pub use storage::{object_key_from_url, S3Store};

/// Every stored object lives below this prefix.
pub const KEY_PREFIX: &str = "recordings/";

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("{0} credentials are not configured")]
    NotConfigured(&'static str),
    #[error("media was still not available after {attempts} download attempts")]
    NotReady { attempts: u32 },
    #[error("download failed: {0}")]
    Download(String),
    #[error("upload of {key} failed: {reason}")]
    Upload { key: String, reason: String },
    #[error("could not sign access URL for {key}: {reason}")]
    Presign { key: String, reason: String },
    #[error("not a stored media reference: {0}")]
    InvalidReference(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The provider has not finalized the artifact yet.
    #[error("media not available yet")]
    NotReady,
    #[error("telephony credentials are not configured")]
    NotConfigured,
    #[error("{0}")]
    Failed(String),
}

/// Where media is downloaded from.
#[async_trait]
pub trait MediaSource: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Durable object storage with signed read access.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), TransferError>;

    async fn presign(&self, key: &str, expiry: Duration) -> Result<String, TransferError>;

    /// Recover the object key from a URL previously returned by `presign`.
    fn key_from_reference(&self, reference: &str) -> Result<String, TransferError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config() -> Self {
        Self {
            max_attempts: CONFIG.settings.retry_attempts.max(1) as u32,
            base_delay: Duration::from_secs(CONFIG.settings.retry_base_delay.max(0) as u64),
        }
    }

    /// Backoff after the given failed attempt (1-based): base, 2x, 4x, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransferRequest<'a> {
    pub source_url: &'a str,
    pub filename: &'a str,
    /// Declared type of the media, e.g. `audio/wav`.
    pub content_type: &'a str,
    /// Creation day of the inbox item, `YYYY-MM-DD`.
    pub date_bucket: &'a str,
    pub expiry: Duration,
}

#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub key: String,
    pub url: String,
    pub size: usize,
    pub content_type: String,
}

/// Moves media from the telephony provider into object storage.
#[derive(Clone)]
pub struct MediaTransfer {
    source: Arc<dyn MediaSource>,
    store: Arc<dyn ObjectStore>,
    policy: RetryPolicy,
    min_bytes: usize,
}

impl MediaTransfer {
    pub fn new(source: Arc<dyn MediaSource>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            source,
            store,
            policy: RetryPolicy::from_config(),
            min_bytes: CONFIG.settings.min_media_bytes.max(0) as usize,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn source_configured(&self) -> bool {
        self.source.is_configured()
    }

    pub fn store_configured(&self) -> bool {
        self.store.is_configured()
    }

    /// Whether a transfer could succeed at all with the current credentials.
    pub fn is_ready(&self) -> bool {
        self.source_configured() && self.store_configured()
    }

    /// Download the media, upload it under `recordings/{date_bucket}/{filename}`
    /// and sign a read URL for it.
    pub async fn transfer(&self, request: &TransferRequest<'_>) -> Result<StoredMedia, TransferError> {
        if !self.source_configured() {
            return Err(TransferError::NotConfigured("Telephony"));
        }
        if !self.store_configured() {
            return Err(TransferError::NotConfigured("Object storage"));
        }

        let body = self.download(request.source_url).await?;
        let size = body.len();
        log::debug!("Downloaded {size} bytes from {}", request.source_url);

        if size < self.min_bytes {
            log::warn!(
                "Media from {} is only {size} bytes, it may be silent or corrupt",
                request.source_url
            );
        }

        let content_type = resolve_content_type(request.content_type, &body);
        let key = object_key(request.date_bucket, request.filename);

        log::debug!("Uploading {key} ({content_type})");
        self.store.put(&key, body, &content_type).await?;

        let url = self.store.presign(&key, request.expiry).await?;
        log::info!("Stored {key} ({size} bytes)");

        Ok(StoredMedia {
            key,
            url,
            size,
            content_type,
        })
    }

    /// Sign a fresh URL for an object that was stored earlier. Nothing is
    /// downloaded or uploaded.
    pub async fn refresh_url(&self, reference: &str, expiry: Duration) -> Result<String, TransferError> {
        if !self.store_configured() {
            return Err(TransferError::NotConfigured("Object storage"));
        }

        let key = self.store.key_from_reference(reference)?;
        self.store.presign(&key, expiry).await
    }

    /// Fetch with retries on "not ready". Any other failure aborts at once.
    async fn download(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        let mut attempt = 1;
        loop {
            match self.source.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(FetchError::NotReady) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    log::info!(
                        "Media at {url} not ready (attempt {attempt}/{}), retrying in {}s",
                        self.policy.max_attempts,
                        delay.as_secs()
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(FetchError::NotReady) => {
                    log::error!("Media at {url} still not ready after {attempt} attempts");
                    return Err(TransferError::NotReady { attempts: attempt });
                }
                Err(FetchError::NotConfigured) => {
                    return Err(TransferError::NotConfigured("Telephony"));
                }
                Err(FetchError::Failed(reason)) => {
                    log::error!("Download of {url} failed: {reason}");
                    return Err(TransferError::Download(reason));
                }
            }
        }
    }
}

pub fn object_key(date_bucket: &str, filename: &str) -> String {
    format!("{KEY_PREFIX}{date_bucket}/{filename}")
}

/// Keep filenames to characters that survive URL signing unchanged.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// Prefer the type sniffed from the bytes when it agrees with the declared
/// kind (`audio/*`, `image/*`), otherwise keep the declared type.
pub fn resolve_content_type(declared: &str, body: &[u8]) -> String {
    let declared = declared.split(';').next().unwrap_or(declared).trim();
    let declared_kind = declared.split('/').next().unwrap_or_default();

    match infer::get(body) {
        Some(kind) if kind.mime_type().split('/').next() == Some(declared_kind) => {
            kind.mime_type().to_string()
        }
        _ => declared.to_string(),
    }
}
