use crate::error::{ProcessingError, Result};
use crate::models::AnomalyRecord;
use crate::storage::{AnomalyStore, StoredAnomaly};
use crate::utils::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF_MS, MAX_BATCH_SIZE,
};
use crate::utils::ids::{IdGenerator, UuidGenerator};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub records_written: usize,
    pub batches: usize,
}

/// Persists anomaly records in fixed-size batches, retrying each batch.
///
/// Delivery is at-least-once per batch; a failed run may leave earlier
/// batches persisted.
pub struct BatchWriter {
    store: Arc<dyn AnomalyStore>,
    ids: Arc<dyn IdGenerator>,
    batch_size: usize,
    max_retries: u32,
    backoff: Duration,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn AnomalyStore>) -> Self {
        Self {
            store,
            ids: Arc::new(UuidGenerator),
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }

    /// Clamped to `1..=MAX_BATCH_SIZE`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub async fn write_all(&self, records: &[AnomalyRecord]) -> Result<WriteReport> {
        let mut report = WriteReport::default();
        if records.is_empty() {
            info!("No anomalies found, nothing to store");
            return Ok(report);
        }

        let items: Vec<StoredAnomaly> = records.iter().map(StoredAnomaly::from).collect();

        info!(count = items.len(), "Storing anomalies");
        for (index, chunk) in items.chunks(self.batch_size).enumerate() {
            self.put_with_retry(chunk).await.map_err(|e| {
                ProcessingError::Persistence(format!(
                    "batch {} failed ({} of {} records written): {}",
                    index + 1,
                    report.records_written,
                    items.len(),
                    e
                ))
            })?;

            report.records_written += chunk.len();
            report.batches += 1;
            debug!(batch = index + 1, size = chunk.len(), "Batch stored");
        }

        info!(
            records = report.records_written,
            batches = report.batches,
            "Successfully stored anomalies"
        );
        Ok(report)
    }

    /// Persist a single `processing_error` entry for `source`.
    pub async fn record_processing_error(&self, source: &str, description: &str) -> Result<()> {
        let record = AnomalyRecord::processing_error(
            self.ids.fresh_id(),
            source,
            description,
            Utc::now(),
        );
        let item = StoredAnomaly::from(&record);

        self.store
            .put(&item)
            .await
            .map_err(|e| ProcessingError::Persistence(e.to_string()))
    }

    async fn put_with_retry(&self, chunk: &[StoredAnomaly]) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.store.batch_put(chunk).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(attempt, max_retries = self.max_retries, error = %e, "Batch write failed, retrying");
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
