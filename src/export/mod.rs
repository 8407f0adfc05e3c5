//! Export writer
//!
//! Serializes the accumulated records of a run to BOM-prefixed CSV and stores
//! them under a deterministic, date-partitioned key.

mod csv;
mod partition;

pub use self::csv::{render_csv, UTF8_BOM};
pub use partition::{export_file_name, partition_key};

use crate::config::CrawlRequest;
use crate::storage::{ObjectStore, StorageResult};
use crate::transform::{CanonicalRecord, Schema};
use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Content type recorded with every export
pub const CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Where an export goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub bucket: String,
    pub key: String,
}

impl ExportTarget {
    pub fn new(request: &CrawlRequest, date: NaiveDate) -> Self {
        Self {
            bucket: request.storage_bucket.clone(),
            key: partition_key(request.category, date),
        }
    }
}

/// Outcome of a successful export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub location: String,
    pub rows: usize,
    pub bytes: usize,
    /// Hex SHA-256 of the stored bytes
    pub checksum: String,
}

/// Writes exports to an object store
#[derive(Clone)]
pub struct ExportWriter {
    store: Arc<dyn ObjectStore>,
}

impl ExportWriter {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Location string of `target` in the underlying store
    pub fn location(&self, target: &ExportTarget) -> String {
        self.store.location(&target.bucket, &target.key)
    }

    /// Renders and uploads the records; upload failures are not retried
    ///
    /// # Arguments
    ///
    /// * `target` - Destination bucket and key
    /// * `schema` - Column layout, used for the header even with no records
    /// * `records` - Rows in crawl order
    pub async fn write(
        &self,
        target: &ExportTarget,
        schema: &Schema,
        records: &[CanonicalRecord],
    ) -> StorageResult<ExportReceipt> {
        let body = render_csv(schema, records)?;
        let checksum = hex::encode(Sha256::digest(&body));
        let bytes = body.len();

        self.store
            .put(&target.bucket, &target.key, body, CONTENT_TYPE)
            .await?;

        let location = self.location(target);
        tracing::info!(
            "Exported {} rows ({} bytes, sha256 {}) to {}",
            records.len(),
            bytes,
            checksum,
            location
        );

        Ok(ExportReceipt {
            location,
            rows: records.len(),
            bytes,
            checksum,
        })
    }
}
