use crate::error::Result;
use crate::utils::constants::*;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

/// Runtime settings, layered: defaults, then an optional TOML file, then
/// `CLIMATE_ANOMALY_*` environment variables.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    pub bucket_root: PathBuf,

    #[validate(length(min = 1))]
    pub bucket_name: String,

    pub store_path: PathBuf,

    #[validate(range(min = 1, max = MAX_BATCH_SIZE))]
    pub batch_size: usize,

    #[validate(range(max = 10))]
    pub max_retries: u32,

    pub retry_backoff_ms: u64,
}

impl AppConfig {
    /// Load from `path` if given, else from `climate-anomaly.toml` when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p.to_path_buf()).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Self::defaults()?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("bucket_root", DEFAULT_BUCKET_ROOT)?
            .set_default("bucket_name", DEFAULT_BUCKET_NAME)?
            .set_default("store_path", DEFAULT_STORE_PATH)?
            .set_default("batch_size", DEFAULT_BATCH_SIZE as u64)?
            .set_default("max_retries", DEFAULT_MAX_RETRIES as u64)?
            .set_default("retry_backoff_ms", DEFAULT_RETRY_BACKOFF_MS)?)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bucket_root: PathBuf::from(DEFAULT_BUCKET_ROOT),
            bucket_name: DEFAULT_BUCKET_NAME.to_string(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_file_overrides_defaults() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "bucket_name = \"climate-uploads\"")?;
        writeln!(file, "batch_size = 10")?;

        let config = AppConfig::load(Some(file.path()))?;

        assert_eq!(config.bucket_name, "climate-uploads");
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.bucket_root, PathBuf::from(DEFAULT_BUCKET_ROOT));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.retry_backoff(), Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS));

        Ok(())
    }

    #[test]
    fn test_rejects_oversized_batches() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "batch_size = 100")?;

        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ProcessingError::Validation(_)));

        Ok(())
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/climate-anomaly.toml"))).unwrap_err();
        assert!(matches!(err, ProcessingError::ConfigSource(_)));
    }

    #[test]
    fn test_default_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }
}
