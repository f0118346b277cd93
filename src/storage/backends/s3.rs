use std::time::Duration;

use async_trait::async_trait;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{ClientOptions, ObjectStore, PutPayload};
use tracing::debug;

use crate::errors::{BridgeError, Result};
use crate::storage::S3Target;

use super::object::ObjectClient;

/// Signed (SigV4) access to one object in an S3 bucket.
///
/// Credentials come from the AWS default chain: `AWS_ACCESS_KEY_ID` /
/// `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`, web identity, or instance
/// metadata. Without an explicit region `AWS_REGION` is used, then
/// `us-east-1`.
pub struct S3ObjectClient {
    store: AmazonS3,
    path: ObjectPath,
    location: String,
}

impl S3ObjectClient {
    pub fn new(target: &S3Target, timeout: Duration) -> Result<Self> {
        Self::with_builder(AmazonS3Builder::from_env(), target, timeout)
    }

    /// Same as [`S3ObjectClient::new`] on top of a caller-supplied builder
    /// (explicit credentials, custom client options).
    pub fn with_builder(
        builder: AmazonS3Builder,
        target: &S3Target,
        timeout: Duration,
    ) -> Result<Self> {
        let mut builder = builder
            .with_bucket_name(target.bucket.as_str())
            .with_client_options(ClientOptions::new().with_timeout(timeout));
        if let Some(region) = &target.region {
            builder = builder.with_region(region.as_str());
        }
        if let Some(endpoint) = &target.endpoint {
            // 自建网关（MinIO 等）走 path-style
            builder = builder
                .with_endpoint(endpoint.as_str())
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder.build().map_err(|e| {
            BridgeError::storage_config(format!(
                "invalid s3 configuration for bucket '{}': {}",
                target.bucket, e
            ))
        })?;

        Ok(Self {
            store,
            path: ObjectPath::from(target.object.as_str()),
            location: target.location(),
        })
    }
}

#[async_trait]
impl ObjectClient for S3ObjectClient {
    async fn download(&self) -> Result<Option<Vec<u8>>> {
        let result = match self.store.get(&self.path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => {
                return Err(BridgeError::storage_unavailable(format!(
                    "failed to download {}: {}",
                    self.location, e
                )));
            }
        };

        let body = result.bytes().await.map_err(|e| {
            BridgeError::storage_unavailable(format!("failed to read {}: {}", self.location, e))
        })?;
        debug!("Downloaded {} bytes from {}", body.len(), self.location);
        Ok(Some(body.to_vec()))
    }

    async fn upload(&self, body: Vec<u8>) -> Result<()> {
        self.store
            .put(&self.path, PutPayload::from(body))
            .await
            .map(|_| ())
            .map_err(|e| {
                BridgeError::storage_unavailable(format!(
                    "failed to upload {}: {}",
                    self.location, e
                ))
            })
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}
