//! Blob storage for published ingestion artifacts.

mod memory;
mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;
use tracing::info;

pub use memory::{MemoryBucketStore, StoredObject};
pub use s3::{S3BucketStore, S3Config};

#[derive(Debug, Error)]
pub enum BucketError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("sdk error: {0}")]
    Sdk(String),
    #[error("object not found: {0}")]
    NotFound(String),
}

impl BucketError {
    pub(crate) fn from_sdk(err: impl fmt::Display) -> Self {
        Self::Sdk(err.to_string())
    }
}

/// Whether [`BucketStore::ensure_container`] had to create the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Existing,
    Created,
}

#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Name of the container (bucket) objects are written to.
    fn container(&self) -> &str;
    async fn ensure_container(&self) -> Result<ContainerState, BucketError>;
    /// Writes `bytes` under `key`, replacing any existing object.
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError>;
    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError>;
    async fn delete_object(&self, key: &str) -> Result<(), BucketError>;
}

/// Creates the container if it is absent, then uploads `bytes` to `key`,
/// unconditionally overwriting whatever was stored there.
pub async fn publish<S>(
    store: &S,
    key: &str,
    bytes: Bytes,
    content_type: &str,
) -> Result<(), BucketError>
where
    S: BucketStore + ?Sized,
{
    if store.ensure_container().await? == ContainerState::Created {
        info!(container = store.container(), "created missing container");
    }

    let size = bytes.len();
    store.put_object(key, bytes, content_type).await?;
    info!(container = store.container(), key, size, "uploaded artifact");
    Ok(())
}
