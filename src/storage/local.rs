use crate::storage::traits::{validate_key, ObjectStore, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Object store backed by a local directory
///
/// Objects land at `<root>/<bucket>/<key>`. Writes go to a temporary sibling
/// first and are renamed into place.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of an object
    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        key.split('/')
            .fold(self.root.join(bucket), |path, segment| path.join(segment))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        validate_key(key)?;
        validate_key(bucket)?;

        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staging = path.with_extension("partial");
        tokio::fs::write(&staging, &body).await?;
        tokio::fs::rename(&staging, &path).await?;

        tracing::info!(
            "Wrote {} bytes ({}) to {}",
            body.len(),
            content_type,
            path.display()
        );
        Ok(())
    }

    fn location(&self, bucket: &str, key: &str) -> String {
        self.object_path(bucket, key).display().to_string()
    }
}
