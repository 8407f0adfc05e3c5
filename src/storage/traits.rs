//! Storage traits and error types
//!
//! This module defines the trait interface for object storage backends and
//! associated error types.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload of {key} to bucket {bucket} failed: {message}")]
    Upload {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for object storage backend implementations
///
/// A put either stores the complete object or fails; there is no partial
/// write visible to readers.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `body` under `bucket`/`key`, replacing any existing object
    ///
    /// # Arguments
    ///
    /// * `bucket` - Destination bucket
    /// * `key` - Object key, `/`-separated
    /// * `body` - Object bytes
    /// * `content_type` - MIME type recorded with the object
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Human-readable location of an object in this store
    fn location(&self, bucket: &str, key: &str) -> String {
        format!("s3://{}/{}", bucket, key)
    }
}

/// Rejects keys that could escape a bucket or collide with directory markers
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.ends_with('/')
        || key.split('/').any(|segment| segment.is_empty() || segment == "..")
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
