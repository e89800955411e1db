//! Boundary invocation: a storage arrival event in, a status report out.

use crate::error::Result;
use crate::models::{InvocationOutcome, ScanSummary, StorageEvent};
use crate::processors::{AnomalyScanner, ScanSink, TracingSink};
use crate::readers::decode_utf8;
use crate::storage::{BatchWriter, BucketStore};
use std::sync::Arc;
use tracing::{error, info, instrument};

pub struct EventHandler {
    buckets: Arc<dyn BucketStore>,
    writer: BatchWriter,
    scanner: AnomalyScanner,
    sink: Arc<dyn ScanSink>,
}

impl EventHandler {
    pub fn new(buckets: Arc<dyn BucketStore>, writer: BatchWriter) -> Self {
        Self {
            buckets,
            writer,
            scanner: AnomalyScanner::new(),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_scanner(mut self, scanner: AnomalyScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ScanSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Never fails: errors become a `failure` outcome after one attempt
    /// to persist a `processing_error` entry.
    #[instrument(skip(self, event), fields(bucket = %event.container, key = %event.object_key))]
    pub async fn handle(&self, event: &StorageEvent) -> InvocationOutcome {
        match self.process(event).await {
            Ok(summary) => InvocationOutcome::success(
                event,
                summary.rows_processed,
                summary.anomalies_found,
            ),
            Err(e) => {
                if e.is_scan_fatal() {
                    error!(error = %e, "Scan aborted on invalid input");
                } else {
                    error!(error = %e, "Error processing file");
                }

                info!("Attempting to record error");
                match self
                    .writer
                    .record_processing_error(&event.object_key, &e.to_string())
                    .await
                {
                    Ok(()) => info!("Successfully recorded error"),
                    Err(record_error) => {
                        error!(error = %record_error, "Failed to record error")
                    }
                }

                InvocationOutcome::failure(event, format!("Error processing file: {}", e))
            }
        }
    }

    async fn process(&self, event: &StorageEvent) -> Result<ScanSummary> {
        let bytes = self
            .buckets
            .get_object(&event.container, &event.object_key)
            .await?;
        info!(size = bytes.len(), "Read file content");

        let text = decode_utf8(&bytes)?;
        let outcome = self
            .scanner
            .scan_text(&text, &event.object_key, self.sink.as_ref())?;
        info!("{}", outcome.summary.summary());

        self.writer.write_all(&outcome.anomalies).await?;
        Ok(outcome.summary)
    }
}
