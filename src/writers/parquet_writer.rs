use crate::error::{ProcessingError, Result};
use crate::storage::StoredAnomaly;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DECIMAL_PRECISION, DECIMAL_SCALE, DEFAULT_ROW_GROUP_SIZE,
};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Exports stored anomaly entries to a Parquet file.
pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    /// Write entries in chunks of `batch_size` rows. Returns the number of
    /// rows written; nothing is created for an empty input.
    pub fn write_anomalies(
        &self,
        entries: &[StoredAnomaly],
        path: &Path,
        batch_size: usize,
    ) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let schema = self.create_schema();
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        for chunk in entries.chunks(batch_size.max(1)) {
            let batch = self.entries_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
        }
        writer.close()?;

        Ok(entries.len())
    }

    fn create_schema(&self) -> Arc<Schema> {
        let fields = vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("file_name", DataType::Utf8, false),
            Field::new("row_number", DataType::UInt64, true),
            Field::new("type", DataType::Utf8, false),
            Field::new(
                "temperature",
                DataType::Decimal128(DECIMAL_PRECISION, DECIMAL_SCALE),
                true,
            ),
            Field::new("description", DataType::Utf8, false),
            Field::new(
                "detected_at",
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                false,
            ),
            Field::new("region", DataType::Utf8, true),
            Field::new("country", DataType::Utf8, true),
            Field::new("state", DataType::Utf8, true),
            Field::new("city", DataType::Utf8, true),
            Field::new("month", DataType::Utf8, true),
            Field::new("day", DataType::Utf8, true),
            Field::new("year", DataType::Utf8, true),
            Field::new("location", DataType::Utf8, true),
        ];

        Arc::new(Schema::new(fields))
    }

    fn entries_to_batch(
        &self,
        entries: &[StoredAnomaly],
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        let row_numbers: Vec<Option<u64>> = entries.iter().map(|e| e.row_number).collect();
        let kinds: Vec<&str> = entries.iter().map(|e| e.kind.as_str()).collect();
        let temperatures: Vec<Option<i128>> = entries
            .iter()
            .map(|e| {
                e.temperature.and_then(|value| {
                    let scaled = scaled_mantissa(value);
                    if scaled.is_none() {
                        warn!(id = %e.id, %value, "Temperature exceeds export precision, writing null");
                    }
                    scaled
                })
            })
            .collect();
        let detected: Vec<i64> = entries
            .iter()
            .map(|e| e.detected_at.timestamp_micros())
            .collect();

        let temperature_array = Decimal128Array::from(temperatures)
            .with_precision_and_scale(DECIMAL_PRECISION, DECIMAL_SCALE)?;
        let detected_array = TimestampMicrosecondArray::from(detected).with_timezone("UTC");

        let columns: Vec<ArrayRef> = vec![
            string_column(entries.iter().map(|e| e.id.as_str())),
            string_column(entries.iter().map(|e| e.file_name.as_str())),
            Arc::new(UInt64Array::from(row_numbers)),
            Arc::new(StringArray::from(kinds)),
            Arc::new(temperature_array),
            string_column(entries.iter().map(|e| e.description.as_str())),
            Arc::new(detected_array),
            optional_string_column(entries.iter().map(|e| e.region.as_deref())),
            optional_string_column(entries.iter().map(|e| e.country.as_deref())),
            optional_string_column(entries.iter().map(|e| e.state.as_deref())),
            optional_string_column(entries.iter().map(|e| e.city.as_deref())),
            optional_string_column(entries.iter().map(|e| e.month.as_deref())),
            optional_string_column(entries.iter().map(|e| e.day.as_deref())),
            optional_string_column(entries.iter().map(|e| e.year.as_deref())),
            optional_string_column(entries.iter().map(|e| e.location.as_deref())),
        ];

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Get file information
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let total_rows = metadata.file_metadata().num_rows();
        let file_size = std::fs::metadata(path)?.len();

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            file_size,
            compression: self.compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn string_column<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn optional_string_column<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ArrayRef {
    Arc::new(values.collect::<StringArray>())
}

/// Decimal as an integer at the export scale, `None` when it does not
/// fit the column precision.
fn scaled_mantissa(value: Decimal) -> Option<i128> {
    let scale = DECIMAL_SCALE as u32;
    let rounded = value.round_dp(scale);
    let limit = 10i128.pow(DECIMAL_PRECISION as u32);

    rounded
        .mantissa()
        .checked_mul(10i128.pow(scale - rounded.scale()))
        .filter(|scaled| scaled.abs() < limit)
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} KB\n\
            - Compression: {:?}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1024.0,
            self.compression,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnomalyRecord, GeoContext};
    use chrono::Utc;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::str::FromStr;
    use tempfile::NamedTempFile;

    fn entries() -> Vec<StoredAnomaly> {
        let anomaly = AnomalyRecord::temperature(
            "a1".to_string(),
            "city.csv",
            2,
            150.0,
            GeoContext::unknown(),
            Utc::now(),
        );
        let failure =
            AnomalyRecord::processing_error("e1".to_string(), "bad.csv", "boom", Utc::now());

        vec![
            StoredAnomaly::from(&anomaly),
            StoredAnomaly::from(&failure),
        ]
    }

    #[test]
    fn test_write_empty_entries() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let written = ParquetWriter::new().write_anomalies(&[], temp_file.path(), 100)?;
        assert_eq!(written, 0);
        Ok(())
    }

    #[test]
    fn test_write_and_read_back() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;

        let written = writer.write_anomalies(&entries(), temp_file.path(), 1)?;
        assert_eq!(written, 2);
        assert_eq!(writer.get_file_info(temp_file.path())?.total_rows, 2);

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(temp_file.path())?)?
            .build()?;
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        let first = &batches[0];

        let temperatures = first
            .column_by_name("temperature")
            .and_then(|c| c.as_any().downcast_ref::<Decimal128Array>())
            .unwrap();
        assert_eq!(temperatures.value(0), 1_500_000_000_000);

        let kinds = first
            .column_by_name("type")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .unwrap();
        assert_eq!(kinds.value(0), "temperature_anomaly");

        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new()?;

            let result = writer.write_anomalies(&entries(), temp_file.path(), 100);
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetWriter::new().with_compression("brotli-9").is_err());
        Ok(())
    }

    #[test]
    fn test_scaled_mantissa() {
        assert_eq!(scaled_mantissa(Decimal::from_str("150.0").unwrap()), Some(1_500_000_000_000));
        assert_eq!(scaled_mantissa(Decimal::from_str("-10.25").unwrap()), Some(-102_500_000_000));
    }

    #[test]
    fn test_scaled_mantissa_beyond_precision() {
        // 5e28 overflows i128 at scale 10; 1.5e28 fits i128 but not 38 digits
        assert_eq!(scaled_mantissa(Decimal::from_str("50000000000000000000000000000").unwrap()), None);
        assert_eq!(scaled_mantissa(Decimal::from_str("15000000000000000000000000000").unwrap()), None);
        assert!(scaled_mantissa(Decimal::from_str("9999999999999999999999999999").unwrap()).is_some());
    }

    #[test]
    fn test_oversized_temperature_exports_as_null() -> Result<()> {
        let mut items = entries();
        items[0].temperature = Some(Decimal::from_str("50000000000000000000000000000").unwrap());
        let temp_file = NamedTempFile::new()?;

        let written = ParquetWriter::new().write_anomalies(&items, temp_file.path(), 100)?;
        assert_eq!(written, 2);

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(temp_file.path())?)?
            .build()?;
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        let temperatures = batches[0]
            .column_by_name("temperature")
            .and_then(|c| c.as_any().downcast_ref::<Decimal128Array>())
            .unwrap();
        assert!(temperatures.is_null(0));

        Ok(())
    }
}
