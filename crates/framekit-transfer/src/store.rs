//! Object-store seam and its S3 and in-memory implementations.
//!
//! # Example
//!
//! ```rust,no_run
//! use framekit_transfer::{ObjectStore, S3Store};
//!
//! # async fn example() -> Result<(), framekit_transfer::TransferError> {
//! let store = S3Store::connect("my-datasets").await?;
//! let keys = store.list_keys("runs/2024/").await?;
//! println!("{} objects", keys.len());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::ProvideCredentials;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, info};

use crate::error::TransferError;

/// Flat key/value object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), TransferError>;

    /// Every key starting with `prefix`, in store order.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, TransferError>;

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, TransferError>;
}

/// Amazon S3 bucket.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Creates a store with a pre-built S3 client. No checks are made.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Creates a store from the standard AWS config chain and checks that
    /// credentials, region and the bucket are all usable.
    pub async fn connect(bucket: impl Into<String>) -> Result<Self, TransferError> {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::from_config(&config, bucket).await
    }

    pub async fn from_config(
        config: &SdkConfig,
        bucket: impl Into<String>,
    ) -> Result<Self, TransferError> {
        let bucket = bucket.into();

        let region = config.region().ok_or(TransferError::MissingRegion)?;
        let provider = config
            .credentials_provider()
            .ok_or_else(|| TransferError::MissingCredentials {
                message: "no credentials provider in the AWS config chain".to_owned(),
            })?;
        provider
            .provide_credentials()
            .await
            .map_err(|e| TransferError::MissingCredentials {
                message: e.to_string(),
            })?;

        let store = Self::new(Client::new(config), bucket);
        store
            .client
            .head_bucket()
            .bucket(&store.bucket)
            .send()
            .await
            .map_err(|e| TransferError::BucketUnreachable {
                bucket: store.bucket.clone(),
                message: e.to_string(),
            })?;

        info!(bucket = %store.bucket, region = %region, "connected to S3 bucket");
        Ok(store)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Maps an AWS SDK error to a [`TransferError::Store`].
fn map_sdk_error(
    err: impl std::error::Error + Send + Sync + 'static,
    op: &str,
    key: &str,
) -> TransferError {
    TransferError::Store {
        message: format!("S3 {op} failed for key {key}: {err}"),
        source: Some(Box::new(err)),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), TransferError> {
        debug!(bucket = %self.bucket, key, content_type, "put object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "PutObject", key))?;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, TransferError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| map_sdk_error(e, "ListObjectsV2", prefix))?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_owned)),
            );
        }
        debug!(bucket = %self.bucket, prefix, count = keys.len(), "listed objects");
        Ok(keys)
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, TransferError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    return Err(TransferError::NotFound {
                        key: key.to_owned(),
                    });
                }
                return Err(map_sdk_error(err, "GetObject", key));
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| map_sdk_error(e, "GetObject", key))?;
        Ok(data.into_bytes().to_vec())
    }
}

/// In-process store keyed in sorted order. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, (Vec<u8>, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, (Vec<u8>, String)>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    /// Content type recorded for `key` at upload.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects().get(key).map(|(_, ct)| ct.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), TransferError> {
        self.objects()
            .insert(key.to_owned(), (body, content_type.to_owned()));
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, TransferError> {
        Ok(self
            .objects()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, TransferError> {
        self.objects()
            .get(key)
            .map(|(body, _)| body.clone())
            .ok_or_else(|| TransferError::NotFound {
                key: key.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_lists_by_prefix() {
        let store = MemoryStore::new();
        store.put_object("ds/a.png", vec![1], "image/png").await.unwrap();
        store.put_object("ds/b/c.txt", vec![2], "text/plain").await.unwrap();
        store.put_object("other/d.txt", vec![3], "text/plain").await.unwrap();

        let keys = store.list_keys("ds/").await.unwrap();
        assert_eq!(keys, vec!["ds/a.png", "ds/b/c.txt"]);
        assert_eq!(store.list_keys("").await.unwrap().len(), 3);
        assert_eq!(store.content_type("ds/a.png").as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn memory_store_missing_key_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_object("nope").await.unwrap_err();
        assert!(matches!(err, TransferError::NotFound { key } if key == "nope"));
    }

    #[tokio::test]
    async fn config_without_region_fails_fast() {
        let config = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .build();
        let err = S3Store::from_config(&config, "bucket").await.unwrap_err();
        assert!(matches!(err, TransferError::MissingRegion));
    }

    #[tokio::test]
    async fn config_without_credentials_fails_fast() {
        let config = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .build();
        let err = S3Store::from_config(&config, "bucket").await.unwrap_err();
        assert!(matches!(err, TransferError::MissingCredentials { .. }), "{err}");
    }
}
