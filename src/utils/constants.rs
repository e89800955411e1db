/// Column holding the reading that is classified
pub const TEMPERATURE_COLUMN: &str = "AvgTemperature";

/// Geographic and date columns copied onto each anomaly
pub const REGION_COLUMN: &str = "Region";
pub const COUNTRY_COLUMN: &str = "Country";
pub const STATE_COLUMN: &str = "State";
pub const CITY_COLUMN: &str = "City";
pub const MONTH_COLUMN: &str = "Month";
pub const DAY_COLUMN: &str = "Day";
pub const YEAR_COLUMN: &str = "Year";

/// Placeholder for geographic fields the row does not carry
pub const UNKNOWN_FIELD: &str = "Unknown";

/// Plausible temperature range; both bounds are themselves normal
pub const MIN_NORMAL_TEMP: f64 = -10.0;
pub const MAX_NORMAL_TEMP: f64 = 110.0;

/// Ingestion filter target: column index and value
pub const FILTER_COUNTRY_INDEX: usize = 1;
pub const FILTER_COUNTRY: &str = "US";
pub const FILTER_SUBDIVISION_INDEX: usize = 2;
pub const FILTER_SUBDIVISION: &str = "Wisconsin";
pub const FILTER_MIN_CELLS: usize = 3;

/// Header is row 1, so data rows start here
pub const FIRST_DATA_ROW: u64 = 2;

/// Persistence defaults
pub const DEFAULT_BATCH_SIZE: usize = 25;
pub const MAX_BATCH_SIZE: usize = 25;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;
pub const DEFAULT_BUCKET_NAME: &str = "file-upload-bucket";
pub const DEFAULT_BUCKET_ROOT: &str = "data/buckets";
pub const DEFAULT_STORE_PATH: &str = "data/anomalies.jsonl";
pub const DEFAULT_CONFIG_FILE: &str = "climate-anomaly.toml";
pub const ENV_PREFIX: &str = "CLIMATE_ANOMALY";

/// Parquet export defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DECIMAL_PRECISION: u8 = 38;
pub const DECIMAL_SCALE: i8 = 10;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
