pub mod anomaly_scanner;
pub mod diagnostics;
pub mod ingestion_filter;

pub use anomaly_scanner::{is_anomalous, parse_reading, AnomalyScanner};
pub use diagnostics::{ScanSink, TracingSink};
#[cfg(test)]
pub(crate) use diagnostics::RecordingSink;
pub use ingestion_filter::{FilterReport, GeoFilter, IngestionFilter};
