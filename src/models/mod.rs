pub mod anomaly;
pub mod event;
pub mod summary;
pub mod table;

pub use anomaly::{AnomalyKind, AnomalyRecord, GeoContext};
pub use event::{InvocationOutcome, InvocationStatus, StorageEvent};
pub use summary::{RowSkip, RowSkipReason, ScanOutcome, ScanSummary};
pub use table::CsvTable;
