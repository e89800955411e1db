use serde::Serialize;
use std::fmt;

use super::AnomalyRecord;

/// Why a data row was passed over without classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSkipReason {
    /// Row ends before the temperature column.
    InsufficientColumns { cells: usize, required: usize },
    /// Temperature cell is not a finite base-10 number.
    UnparseableTemperature { value: String },
}

/// A row-level skip. Not an error: the scan continues past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSkip {
    pub row_number: u64,
    pub reason: RowSkipReason,
}

impl fmt::Display for RowSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            RowSkipReason::InsufficientColumns { cells, required } => write!(
                f,
                "Row {} has insufficient columns ({} of {})",
                self.row_number, cells, required
            ),
            RowSkipReason::UnparseableTemperature { value } => write!(
                f,
                "Row {}, error parsing temperature, value: '{}'",
                self.row_number, value
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Data rows seen, header excluded, skipped rows included
    pub rows_processed: usize,
    pub anomalies_found: usize,
    pub rows_skipped: usize,
}

impl ScanSummary {
    pub fn summary(&self) -> String {
        format!(
            "Processed {} rows, found {} anomalies ({} rows skipped)",
            self.rows_processed, self.anomalies_found, self.rows_skipped
        )
    }
}

/// Everything a scan hands back to its caller.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// In input row order
    pub anomalies: Vec<AnomalyRecord>,
    pub summary: ScanSummary,
}
