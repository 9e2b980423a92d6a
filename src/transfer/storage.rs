use super::{ObjectStore, TransferError, KEY_PREFIX};
use crate::secrets::Secrets;
use async_trait::async_trait;
use aws_config::Region;
use aws_credential_types::Credentials;
use aws_sdk_s3::{error::DisplayErrorContext, presigning::PresigningConfig, primitives::ByteStream, Client};
use std::time::Duration;

/// S3 compatible bucket holding every stored recording and attachment.
#[derive(Clone)]
pub struct S3Store {
    client: Option<Client>,
    bucket: String,
}

impl S3Store {
    /// Build the client from the environment credentials. Without them the
    /// store reports itself as unconfigured and every upload is refused.
    pub async fn from_secrets(secrets: &Secrets) -> Self {
        let bucket = secrets.aws_bucket_name.clone();

        let (Some(access_key), Some(secret_key)) =
            (&secrets.aws_access_key_id, &secrets.aws_secret_access_key)
        else {
            log::warn!("AWS credentials are not set, media uploads are disabled");
            return Self { client: None, bucket };
        };

        // "None" stands in for the session token and expiry
        let creds = Credentials::new(access_key, secret_key, None, None, "songbox");

        let mut loader = aws_config::from_env()
            .region(Region::new(secrets.aws_region.clone()))
            .credentials_provider(creds);
        if let Some(endpoint) = &secrets.aws_endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let cfg = loader.load().await;

        Self {
            client: Some(Client::new(&cfg)),
            bucket,
        }
    }

    fn client(&self) -> Result<&Client, TransferError> {
        self.client
            .as_ref()
            .ok_or(TransferError::NotConfigured("Object storage"))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), TransferError> {
        self.client()?
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| TransferError::Upload {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(())
    }

    async fn presign(&self, key: &str, expiry: Duration) -> Result<String, TransferError> {
        let presign_error = |reason: String| TransferError::Presign {
            key: key.to_string(),
            reason,
        };

        let config = PresigningConfig::expires_in(expiry).map_err(|e| presign_error(e.to_string()))?;
        let request = self
            .client()?
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| presign_error(DisplayErrorContext(&e).to_string()))?;

        Ok(request.uri().to_string())
    }

    fn key_from_reference(&self, reference: &str) -> Result<String, TransferError> {
        object_key_from_url(reference, &self.bucket)
    }
}

/// Extract the object key from a signed (or plain) object URL. Both
/// virtual-hosted (`bucket.s3...amazonaws.com/key`) and path-style
/// (`endpoint/bucket/key`) URLs are accepted; the query string is ignored.
pub fn object_key_from_url(reference: &str, bucket: &str) -> Result<String, TransferError> {
    let invalid = || TransferError::InvalidReference(reference.to_string());

    let url = reqwest::Url::parse(reference).map_err(|_| invalid())?;
    let path = url.path().trim_start_matches('/');
    let path = path
        .strip_prefix(bucket)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path);

    if !path.starts_with(KEY_PREFIX) || path.len() == KEY_PREFIX.len() {
        return Err(invalid());
    }
    Ok(path.to_string())
}
