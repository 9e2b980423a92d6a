//! In-memory media source and object store for exercising transfers without
//! network access.

use super::{object_key_from_url, FetchError, MediaSource, ObjectStore, TransferError};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};
use tokio::time::Instant;

pub const TEST_BUCKET: &str = "songs-test";

/// Answers "not ready" for the first `not_ready` fetches, then `outcome`.
/// URLs containing `/broken` always fail outright.
pub struct FakeSource {
    configured: bool,
    not_ready: usize,
    outcome: Result<Vec<u8>, String>,
    attempts: Mutex<Vec<Instant>>,
}

impl FakeSource {
    pub fn ready(body: Vec<u8>) -> Self {
        Self::not_ready_then(0, body)
    }

    pub fn not_ready_then(not_ready: usize, body: Vec<u8>) -> Self {
        Self {
            configured: true,
            not_ready,
            outcome: Ok(body),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            outcome: Err(reason.to_string()),
            ..Self::ready(Vec::new())
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::ready(Vec::new())
        }
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaSource for FakeSource {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let previous = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(Instant::now());
            attempts.len() - 1
        };

        if url.contains("/broken") {
            return Err(FetchError::Failed("HTTP 500 Internal Server Error".to_string()));
        }
        if previous < self.not_ready {
            return Err(FetchError::NotReady);
        }
        self.outcome.clone().map_err(FetchError::Failed)
    }
}

pub struct FakeStore {
    configured: bool,
    reject: Option<String>,
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    puts: AtomicUsize,
    signatures: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            configured: true,
            reject: None,
            objects: Mutex::new(HashMap::new()),
            puts: AtomicUsize::new(0),
            signatures: AtomicUsize::new(0),
        }
    }

    pub fn rejecting(reason: &str) -> Self {
        Self {
            reject: Some(reason.to_string()),
            ..Self::new()
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn object(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Resolve a signed URL the way a client following it would.
    pub fn fetch_signed(&self, url: &str) -> Option<Vec<u8>> {
        let key = self.key_from_reference(url).ok()?;
        self.object(&key).map(|(body, _)| body)
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), TransferError> {
        if let Some(reason) = &self.reject {
            return Err(TransferError::Upload {
                key: key.to_string(),
                reason: reason.clone(),
            });
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(())
    }

    async fn presign(&self, key: &str, expiry: Duration) -> Result<String, TransferError> {
        let n = self.signatures.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!(
            "https://{TEST_BUCKET}.s3.amazonaws.com/{key}?X-Amz-Expires={}&X-Amz-Signature=sig{n}",
            expiry.as_secs()
        ))
    }

    fn key_from_reference(&self, reference: &str) -> Result<String, TransferError> {
        object_key_from_url(reference, TEST_BUCKET)
    }
}
