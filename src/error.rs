use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage event: {0}")]
    InvalidEvent(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl ProcessingError {
    /// Errors that abort a whole scan rather than skipping a row.
    pub fn is_scan_fatal(&self) -> bool {
        matches!(
            self,
            ProcessingError::MalformedInput(_) | ProcessingError::Schema(_)
        )
    }
}
