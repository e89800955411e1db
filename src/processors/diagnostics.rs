use crate::models::{AnomalyRecord, RowSkip};
use tracing::{debug, info, warn};

/// Logging capability handed to a scan.
///
/// Set up once by the caller and only read during a scan.
pub trait ScanSink: Send + Sync {
    fn headers_read(&self, _headers: &[String]) {}

    fn row_skipped(&self, skip: &RowSkip);

    fn anomaly_found(&self, _record: &AnomalyRecord) {}
}

/// Forwards scan diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ScanSink for TracingSink {
    fn headers_read(&self, headers: &[String]) {
        debug!(?headers, "CSV headers");
    }

    fn row_skipped(&self, skip: &RowSkip) {
        warn!(row = skip.row_number, "{}", skip);
    }

    fn anomaly_found(&self, record: &AnomalyRecord) {
        info!(
            row = record.row_number(),
            temperature = record.temperature_value(),
            "Anomaly detected"
        );
    }
}

#[cfg(test)]
pub(crate) use recording::RecordingSink;

#[cfg(test)]
mod recording {
    use super::ScanSink;
    use crate::models::{AnomalyRecord, RowSkip};
    use std::sync::Mutex;

    /// Keeps every skip and anomaly id it is told about.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        skips: Mutex<Vec<RowSkip>>,
        anomaly_ids: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn skips(&self) -> Vec<RowSkip> {
            self.skips.lock().map(|s| s.clone()).unwrap_or_default()
        }

        pub fn anomaly_ids(&self) -> Vec<String> {
            self.anomaly_ids.lock().map(|a| a.clone()).unwrap_or_default()
        }
    }

    impl ScanSink for RecordingSink {
        fn row_skipped(&self, skip: &RowSkip) {
            if let Ok(mut skips) = self.skips.lock() {
                skips.push(skip.clone());
            }
        }

        fn anomaly_found(&self, record: &AnomalyRecord) {
            if let Ok(mut ids) = self.anomaly_ids.lock() {
                ids.push(record.id().to_string());
            }
        }
    }
}
