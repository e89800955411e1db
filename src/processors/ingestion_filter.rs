use crate::error::{ProcessingError, Result};
use crate::readers::{decode_utf8, CsvTableReader};
use crate::utils::constants::*;
use csv::{Terminator, WriterBuilder};
use tracing::debug;

/// Keeps rows whose country and subdivision cells match fixed targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoFilter {
    min_cells: usize,
    country_index: usize,
    country: String,
    subdivision_index: usize,
    subdivision: String,
}

impl GeoFilter {
    /// The upload path's filter: `US` / `Wisconsin` in columns 1 and 2.
    pub fn wisconsin() -> Self {
        Self {
            min_cells: FILTER_MIN_CELLS,
            country_index: FILTER_COUNTRY_INDEX,
            country: FILTER_COUNTRY.to_string(),
            subdivision_index: FILTER_SUBDIVISION_INDEX,
            subdivision: FILTER_SUBDIVISION.to_string(),
        }
    }

    pub fn matches(&self, row: &[String]) -> bool {
        row.len() >= self.min_cells
            && row.get(self.country_index).map(String::as_str) == Some(self.country.as_str())
            && row.get(self.subdivision_index).map(String::as_str)
                == Some(self.subdivision.as_str())
    }
}

impl Default for GeoFilter {
    fn default() -> Self {
        Self::wisconsin()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub rows_read: usize,
    pub rows_kept: usize,
}

/// Reduces a raw CSV upload to its header plus matching rows.
pub struct IngestionFilter {
    predicate: GeoFilter,
}

impl IngestionFilter {
    pub fn new() -> Self {
        Self {
            predicate: GeoFilter::wisconsin(),
        }
    }

    pub fn with_predicate(predicate: GeoFilter) -> Self {
        Self { predicate }
    }

    pub fn filter(&self, raw: &[u8]) -> Result<Vec<u8>> {
        self.filter_with_report(raw).map(|(bytes, _)| bytes)
    }

    /// Filter and count. Either the whole output is produced or an error
    /// is returned; there is no partial output.
    pub fn filter_with_report(&self, raw: &[u8]) -> Result<(Vec<u8>, FilterReport)> {
        let text = decode_utf8(raw)?;
        let rows = CsvTableReader::new().rows(&text)?;

        let mut writer = WriterBuilder::new()
            .flexible(true)
            .terminator(Terminator::CRLF)
            .from_writer(Vec::with_capacity(raw.len()));
        writer.write_record(rows.headers())?;

        let mut report = FilterReport::default();
        for row in rows {
            let row = row?;
            report.rows_read += 1;

            if self.predicate.matches(&row) {
                writer.write_record(&row)?;
                report.rows_kept += 1;
            }
        }

        let output = writer
            .into_inner()
            .map_err(|e| ProcessingError::Io(e.into_error()))?;

        debug!(
            rows_read = report.rows_read,
            rows_kept = report.rows_kept,
            "Filtered upload"
        );

        Ok((output, report))
    }
}

impl Default for IngestionFilter {
    fn default() -> Self {
        Self::new()
    }
}
