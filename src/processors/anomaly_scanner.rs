use crate::error::{ProcessingError, Result};
use crate::models::table::column_index;
use crate::models::{
    AnomalyRecord, CsvTable, GeoContext, RowSkip, RowSkipReason, ScanOutcome, ScanSummary,
};
use crate::processors::ScanSink;
use crate::readers::CsvTableReader;
use crate::utils::constants::*;
use crate::utils::ids::{IdGenerator, UuidGenerator};
use chrono::Utc;
use std::sync::Arc;

/// Header positions of the optional geographic columns.
#[derive(Debug, Clone, Copy)]
struct GeoColumns {
    region: Option<usize>,
    country: Option<usize>,
    state: Option<usize>,
    city: Option<usize>,
    month: Option<usize>,
    day: Option<usize>,
    year: Option<usize>,
}

impl GeoColumns {
    fn locate(headers: &[String]) -> Self {
        Self {
            region: column_index(headers, REGION_COLUMN),
            country: column_index(headers, COUNTRY_COLUMN),
            state: column_index(headers, STATE_COLUMN),
            city: column_index(headers, CITY_COLUMN),
            month: column_index(headers, MONTH_COLUMN),
            day: column_index(headers, DAY_COLUMN),
            year: column_index(headers, YEAR_COLUMN),
        }
    }

    fn extract(&self, row: &[String]) -> GeoContext {
        let cell = |index: Option<usize>| {
            index
                .and_then(|i| row.get(i))
                .cloned()
                .unwrap_or_else(|| UNKNOWN_FIELD.to_string())
        };

        GeoContext {
            region: cell(self.region),
            country: cell(self.country),
            state: cell(self.state),
            city: cell(self.city),
            month: cell(self.month),
            day: cell(self.day),
            year: cell(self.year),
        }
    }
}

/// True when a reading lies strictly outside the plausible range.
pub fn is_anomalous(value: f64) -> bool {
    value < MIN_NORMAL_TEMP || value > MAX_NORMAL_TEMP
}

/// Parse a temperature cell as a finite base-10 number.
pub fn parse_reading(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Flags rows whose average temperature is physically implausible.
pub struct AnomalyScanner {
    ids: Arc<dyn IdGenerator>,
}

impl AnomalyScanner {
    pub fn new() -> Self {
        Self {
            ids: Arc::new(UuidGenerator),
        }
    }

    pub fn with_id_generator(ids: Arc<dyn IdGenerator>) -> Self {
        Self { ids }
    }

    /// Scan a buffered table.
    pub fn scan(&self, table: &CsvTable, source: &str, sink: &dyn ScanSink) -> Result<ScanOutcome> {
        let mut state = ScanState::begin(self, table.headers(), sink)?;
        for row in table.rows() {
            state.evaluate(row, source, sink);
        }

        Ok(state.finish())
    }

    /// Scan decoded CSV text in one forward pass, holding only the
    /// anomalies in memory.
    pub fn scan_text(&self, text: &str, source: &str, sink: &dyn ScanSink) -> Result<ScanOutcome> {
        let rows = CsvTableReader::new().rows(text)?;
        let headers = rows.headers().to_vec();

        let mut state = ScanState::begin(self, &headers, sink)?;
        for row in rows {
            state.evaluate(&row?, source, sink);
        }

        Ok(state.finish())
    }
}

impl Default for AnomalyScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming state of a single scan.
struct ScanState<'s> {
    ids: &'s dyn IdGenerator,
    temp_index: usize,
    geo: GeoColumns,
    row_number: u64,
    anomalies: Vec<AnomalyRecord>,
    summary: ScanSummary,
}

impl<'s> ScanState<'s> {
    fn begin(scanner: &'s AnomalyScanner, headers: &[String], sink: &dyn ScanSink) -> Result<Self> {
        if headers.is_empty() {
            return Err(ProcessingError::MalformedInput(
                "CSV file is empty or has no headers".to_string(),
            ));
        }
        sink.headers_read(headers);

        let temp_index = column_index(headers, TEMPERATURE_COLUMN).ok_or_else(|| {
            ProcessingError::Schema(format!(
                "missing required temperature column '{}'",
                TEMPERATURE_COLUMN
            ))
        })?;

        Ok(Self {
            ids: scanner.ids.as_ref(),
            temp_index,
            geo: GeoColumns::locate(headers),
            row_number: FIRST_DATA_ROW - 1,
            anomalies: Vec::new(),
            summary: ScanSummary::default(),
        })
    }

    fn evaluate(&mut self, row: &[String], source: &str, sink: &dyn ScanSink) {
        self.row_number += 1;
        self.summary.rows_processed += 1;

        let Some(cell) = row.get(self.temp_index) else {
            self.skip(
                RowSkipReason::InsufficientColumns {
                    cells: row.len(),
                    required: self.temp_index + 1,
                },
                sink,
            );
            return;
        };

        let Some(value) = parse_reading(cell) else {
            self.skip(
                RowSkipReason::UnparseableTemperature {
                    value: cell.clone(),
                },
                sink,
            );
            return;
        };

        if is_anomalous(value) {
            let record = AnomalyRecord::temperature(
                self.ids.fresh_id(),
                source,
                self.row_number,
                value,
                self.geo.extract(row),
                Utc::now(),
            );
            sink.anomaly_found(&record);
            self.anomalies.push(record);
        }
    }

    fn skip(&mut self, reason: RowSkipReason, sink: &dyn ScanSink) {
        self.summary.rows_skipped += 1;
        sink.row_skipped(&RowSkip {
            row_number: self.row_number,
            reason,
        });
    }

    fn finish(mut self) -> ScanOutcome {
        self.summary.anomalies_found = self.anomalies.len();
        ScanOutcome {
            anomalies: self.anomalies,
            summary: self.summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnomalyKind;
    use crate::processors::RecordingSink;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FULL_HEADER: &str = "Region,Country,State,City,Month,Day,Year,AvgTemperature";

    #[derive(Default)]
    struct SequentialIds(AtomicUsize);

    impl IdGenerator for SequentialIds {
        fn fresh_id(&self) -> String {
            format!("anomaly-{}", self.0.fetch_add(1, Ordering::Relaxed))
        }
    }

    fn scanner() -> AnomalyScanner {
        AnomalyScanner::with_id_generator(Arc::new(SequentialIds::default()))
    }

    fn scan_buffered(text: &str) -> Result<(ScanOutcome, RecordingSink)> {
        let sink = RecordingSink::new();
        let table = CsvTableReader::new().read_bytes(text.as_bytes())?;
        let outcome = scanner().scan(&table, "city_temperature.csv", &sink)?;
        Ok((outcome, sink))
    }

    #[test]
    fn test_scenario_out_of_range_reading() -> Result<()> {
        let text = format!("{}\nMidwest,US,Wisconsin,Madison,1,1,2020,150.0\n", FULL_HEADER);
        let (outcome, _) = scan_buffered(&text)?;

        assert_eq!(outcome.summary.rows_processed, 1);
        assert_eq!(outcome.summary.anomalies_found, 1);

        let record = &outcome.anomalies[0];
        assert_eq!(record.id(), "anomaly-0");
        assert_eq!(record.file_name(), "city_temperature.csv");
        assert_eq!(record.kind(), AnomalyKind::TemperatureAnomaly);
        assert_eq!(record.row_number(), Some(2));
        assert_eq!(record.temperature_value(), Some(150.0));
        assert_eq!(
            record.description(),
            "Temperature value 150.0 is outside normal range (-10 to 110)"
        );
        assert_eq!(
            record.location().as_deref(),
            Some("Madison, Wisconsin, US, Midwest")
        );

        let geo = record.geo().unwrap();
        assert_eq!(geo.month, "1");
        assert_eq!(geo.day, "1");
        assert_eq!(geo.year, "2020");

        Ok(())
    }

    #[test]
    fn test_boundaries_are_normal() -> Result<()> {
        let text = format!(
            "{}\nMidwest,US,Wisconsin,Madison,1,1,2020,-10.0\nMidwest,US,Wisconsin,Madison,1,2,2020,110.0\nMidwest,US,Wisconsin,Madison,1,3,2020,-10\nMidwest,US,Wisconsin,Madison,1,4,2020,110\n",
            FULL_HEADER
        );
        let (outcome, sink) = scan_buffered(&text)?;

        assert_eq!(outcome.summary.rows_processed, 4);
        assert_eq!(outcome.summary.anomalies_found, 0);
        assert!(sink.skips().is_empty());

        Ok(())
    }

    #[test]
    fn test_classification_rule() {
        assert!(is_anomalous(-10.01));
        assert!(is_anomalous(110.01));
        assert!(is_anomalous(-99.0));
        assert!(!is_anomalous(-10.0));
        assert!(!is_anomalous(110.0));
        assert!(!is_anomalous(0.0));
        assert!(!is_anomalous(72.4));
    }

    #[test]
    fn test_unparseable_reading_is_skipped() -> Result<()> {
        let text = format!(
            "{}\nMidwest,US,Wisconsin,Madison,1,1,2020,N/A\nMidwest,US,Wisconsin,Madison,1,2,2020,\n",
            FULL_HEADER
        );
        let (outcome, sink) = scan_buffered(&text)?;

        assert_eq!(outcome.summary.rows_processed, 2);
        assert_eq!(outcome.summary.anomalies_found, 0);
        assert_eq!(outcome.summary.rows_skipped, 2);

        let skips = sink.skips();
        assert_eq!(skips[0].row_number, 2);
        assert_eq!(
            skips[0].reason,
            RowSkipReason::UnparseableTemperature {
                value: "N/A".to_string()
            }
        );
        assert_eq!(skips[1].row_number, 3);

        Ok(())
    }

    #[test]
    fn test_non_finite_readings_are_skipped() -> Result<()> {
        let text = "AvgTemperature\ninf\nNaN\n-infinity\n";
        let (outcome, sink) = scan_buffered(text)?;

        assert_eq!(outcome.summary.rows_processed, 3);
        assert_eq!(outcome.summary.anomalies_found, 0);
        assert_eq!(sink.skips().len(), 3);

        Ok(())
    }

    #[test]
    fn test_parse_reading() {
        assert_eq!(parse_reading("150.0"), Some(150.0));
        assert_eq!(parse_reading("-12"), Some(-12.0));
        assert_eq!(parse_reading("+3.5"), Some(3.5));
        assert_eq!(parse_reading(" 42.1 "), Some(42.1));
        assert_eq!(parse_reading(".5"), Some(0.5));
        assert_eq!(parse_reading("1,5"), None);
        assert_eq!(parse_reading(""), None);
        assert_eq!(parse_reading("abc"), None);
    }

    #[test]
    fn test_short_row_counts_but_never_flags() -> Result<()> {
        let text = format!(
            "{}\nMidwest,US,Wisconsin\nMidwest,US,Wisconsin,Madison,1,2,2020,-40.0\n",
            FULL_HEADER
        );
        let (outcome, sink) = scan_buffered(&text)?;

        assert_eq!(outcome.summary.rows_processed, 2);
        assert_eq!(outcome.summary.anomalies_found, 1);
        assert_eq!(outcome.anomalies[0].row_number(), Some(3));
        assert_eq!(
            sink.skips()[0].reason,
            RowSkipReason::InsufficientColumns {
                cells: 3,
                required: 8
            }
        );

        Ok(())
    }

    #[test]
    fn test_missing_temperature_column_is_schema_error() {
        let text = "Region,Country,State,City,Month,Day,Year,AvgTemp\nMidwest,US,Wisconsin,Madison,1,1,2020,500\n";
        let err = scan_buffered(text).unwrap_err();
        assert!(matches!(err, ProcessingError::Schema(_)));
        assert!(err.is_scan_fatal());

        let err = scan_buffered("avgtemperature\n500\n").unwrap_err();
        assert!(matches!(err, ProcessingError::Schema(_)));
    }

    #[test]
    fn test_empty_input_is_malformed() {
        let err = scanner()
            .scan_text("", "empty.csv", &RecordingSink::new())
            .unwrap_err();
        assert!(matches!(err, ProcessingError::MalformedInput(_)));
    }

    #[test]
    fn test_missing_geo_columns_default_to_unknown() -> Result<()> {
        let (outcome, _) = scan_buffered("AvgTemperature\n200\n")?;

        let record = &outcome.anomalies[0];
        assert_eq!(record.geo(), Some(&GeoContext::unknown()));
        assert_eq!(
            record.location().as_deref(),
            Some("Unknown, Unknown, Unknown, Unknown")
        );

        Ok(())
    }

    #[test]
    fn test_geo_cells_beyond_short_row_default_to_unknown() -> Result<()> {
        let (outcome, _) = scan_buffered("AvgTemperature,City,State\n-55.5,Madison\n")?;

        let geo = outcome.anomalies[0].geo().unwrap();
        assert_eq!(geo.city, "Madison");
        assert_eq!(geo.state, "Unknown");
        assert_eq!(geo.region, "Unknown");

        Ok(())
    }

    #[test]
    fn test_anomalies_keep_input_order() -> Result<()> {
        let text = "City,AvgTemperature\nA,120\nB,50\nC,-20\nD,999\n";
        let (outcome, sink) = scan_buffered(text)?;

        let rows: Vec<Option<u64>> = outcome.anomalies.iter().map(|a| a.row_number()).collect();
        assert_eq!(rows, vec![Some(2), Some(4), Some(5)]);

        let ids: Vec<String> = outcome.anomalies.iter().map(|a| a.id().to_string()).collect();
        assert_eq!(ids, sink.anomaly_ids());

        Ok(())
    }

    #[test]
    fn test_streaming_matches_buffered_scan() -> Result<()> {
        let text = format!(
            "{}\nMidwest,US,Wisconsin,Madison,1,1,2020,150.0\nMidwest,US,Wisconsin\nSouth,US,Texas,Austin,7,4,2020,115.2\n",
            FULL_HEADER
        );

        let (buffered, _) = scan_buffered(&text)?;
        let streamed = scanner().scan_text(&text, "city_temperature.csv", &RecordingSink::new())?;

        assert_eq!(buffered.summary, streamed.summary);
        let rows = |o: &ScanOutcome| -> Vec<Option<u64>> {
            o.anomalies.iter().map(|a| a.row_number()).collect()
        };
        assert_eq!(rows(&buffered), rows(&streamed));

        Ok(())
    }

    #[test]
    fn test_blank_lines_count_as_short_rows() -> Result<()> {
        let sink = RecordingSink::new();
        let outcome = scanner().scan_text("AvgTemperature\n\n200\n", "city.csv", &sink)?;

        assert_eq!(outcome.summary.rows_processed, 2);
        assert_eq!(outcome.summary.rows_skipped, 1);
        assert_eq!(outcome.anomalies[0].row_number(), Some(3));
        assert_eq!(
            sink.skips(),
            vec![RowSkip {
                row_number: 2,
                reason: RowSkipReason::InsufficientColumns { cells: 0, required: 1 },
            }]
        );

        Ok(())
    }

    #[test]
    fn test_leading_blank_line_is_malformed() {
        let err = scanner()
            .scan_text("\nAvgTemperature\n200\n", "city.csv", &RecordingSink::new())
            .unwrap_err();
        assert!(matches!(err, ProcessingError::MalformedInput(_)));
    }
}
