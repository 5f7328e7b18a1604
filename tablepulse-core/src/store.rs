use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tablepulse_common::{Result, TablePulseError};

/// One object in a bucket+prefix listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteObject {
    pub key: String,
    pub size: u64,
}

/// Minimal object-storage capability consumed by the sync stage.
/// Implementations must treat every call as independently fallible;
/// callers decide whether a failure aborts the batch.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Enumerate all objects under `prefix`, in listing order.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<RemoteObject>>;
    /// Fetch one object into `dest`, overwriting. Returns bytes written.
    async fn get(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64>;
    /// Upload one local file to `bucket`/`key`.
    async fn put(&self, src: &Path, bucket: &str, key: &str) -> Result<()>;
}

/// S3-backed store using ambient AWS credentials.
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

const OPERATION_TIMEOUT_SECS: u64 = 300;
const ATTEMPT_TIMEOUT_SECS: u64 = 60;

impl S3Store {
    pub async fn connect(endpoint_url: Option<&str>) -> Self {
        let config = aws_config::load_from_env().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&config).timeout_config(
            aws_sdk_s3::config::timeout::TimeoutConfig::builder()
                .operation_timeout(std::time::Duration::from_secs(OPERATION_TIMEOUT_SECS))
                .operation_attempt_timeout(std::time::Duration::from_secs(ATTEMPT_TIMEOUT_SECS))
                .build(),
        );
        if let Some(ep) = endpoint_url {
            builder = builder.endpoint_url(ep);
        }
        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
        }
    }
}

impl ObjectStore for S3Store {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<RemoteObject>> {
        let mut objects = Vec::new();
        let mut paginator = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();
        while let Some(page) = paginator.next().await {
            let page = page.map_err(|e| TablePulseError::Storage(e.to_string()))?;
            for obj in page.contents() {
                if let Some(key) = obj.key() {
                    objects.push(RemoteObject {
                        key: key.to_owned(),
                        size: obj.size().unwrap_or(0).max(0) as u64,
                    });
                }
            }
        }
        Ok(objects)
    }

    async fn get(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| TablePulseError::Storage(e.to_string()))?;
        let body: Bytes = resp
            .body
            .collect()
            .await
            .map_err(|e| TablePulseError::Storage(e.to_string()))?
            .into_bytes();
        std::fs::write(dest, &body)?;
        Ok(body.len() as u64)
    }

    async fn put(&self, src: &Path, bucket: &str, key: &str) -> Result<()> {
        let body = aws_sdk_s3::primitives::ByteStream::from_path(src)
            .await
            .map_err(|e| TablePulseError::Storage(e.to_string()))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| TablePulseError::Storage(e.to_string()))?;
        Ok(())
    }
}
