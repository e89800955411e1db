//! Upload path: filter a local CSV and place it in object storage.

use crate::error::{ProcessingError, Result};
use crate::processors::IngestionFilter;
use crate::storage::BucketStore;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub bucket: String,
    pub object_key: String,
    pub rows_read: usize,
    pub rows_kept: usize,
}

impl UploadReport {
    pub fn summary(&self) -> String {
        format!(
            "Uploaded {}/{}: kept {} of {} rows",
            self.bucket, self.object_key, self.rows_kept, self.rows_read
        )
    }
}

pub struct Uploader {
    buckets: Arc<dyn BucketStore>,
    bucket: String,
    filter: IngestionFilter,
}

impl Uploader {
    pub fn new(buckets: Arc<dyn BucketStore>, bucket: impl Into<String>) -> Self {
        Self {
            buckets,
            bucket: bucket.into(),
            filter: IngestionFilter::new(),
        }
    }

    pub fn with_filter(mut self, filter: IngestionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Filter `path` and store it under `object_key` (default: file name).
    pub async fn upload_file(&self, path: &Path, object_key: Option<&str>) -> Result<UploadReport> {
        let object_key = match object_key {
            Some(key) => key.to_string(),
            None => path
                .file_name()
                .and_then(|f| f.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    ProcessingError::InvalidEvent(format!(
                        "cannot derive object key from {}",
                        path.display()
                    ))
                })?,
        };

        let raw = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => ProcessingError::NotFound(path.display().to_string()),
            _ => ProcessingError::Io(e),
        })?;

        let (filtered, report) = self.filter.filter_with_report(&raw)?;

        info!(
            source = %path.display(),
            bucket = %self.bucket,
            key = %object_key,
            "Uploading filtered data"
        );
        self.buckets
            .put_object(&self.bucket, &object_key, filtered)
            .await?;

        Ok(UploadReport {
            bucket: self.bucket.clone(),
            object_key,
            rows_read: report.rows_read,
            rows_kept: report.rows_kept,
        })
    }
}
