//! Object storage boundary: where raw uploads land and scans read from.

use crate::error::{ProcessingError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::info;

#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Create the bucket if needed; `true` when it was created.
    async fn ensure_bucket(&self, bucket: &str) -> Result<bool>;
    async fn put_object(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()>;
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

/// Buckets as directories under a root, objects as files.
#[derive(Debug, Clone)]
pub struct LocalBucketStore {
    root: PathBuf,
}

impl LocalBucketStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf> {
        let mut components = Path::new(bucket).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(bucket)),
            _ => Err(ProcessingError::InvalidEvent(format!(
                "invalid bucket name: '{}'",
                bucket
            ))),
        }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(ProcessingError::InvalidEvent(format!(
                "invalid object key: '{}'",
                key
            )));
        }

        Ok(self.bucket_path(bucket)?.join(relative))
    }
}

#[async_trait]
impl BucketStore for LocalBucketStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<bool> {
        let path = self.bucket_path(bucket)?;
        if tokio::fs::try_exists(&path).await? {
            info!(bucket, "Bucket already exists");
            return Ok(false);
        }

        tokio::fs::create_dir_all(&path).await?;
        info!(bucket, path = %path.display(), "Created bucket");
        Ok(true)
    }

    async fn put_object(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let bucket_path = self.bucket_path(bucket)?;
        if !tokio::fs::try_exists(&bucket_path).await? {
            return Err(ProcessingError::NotFound(format!("bucket '{}'", bucket)));
        }

        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => ProcessingError::NotFound(format!("{}/{}", bucket, key)),
            _ => ProcessingError::Io(e),
        })
    }
}
