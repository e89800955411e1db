use crate::error::{ProcessingError, Result};
use crate::models::{AnomalyKind, AnomalyRecord};
use crate::utils::decimal::exact_decimal;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Persisted shape of an anomaly entry, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnomaly {
    pub id: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_number: Option<u64>,
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Decimal>,
    pub description: String,
    pub detected_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A reading outside the decimal range is stored without `temperature`;
/// the description still carries its text.
impl From<&AnomalyRecord> for StoredAnomaly {
    fn from(record: &AnomalyRecord) -> Self {
        let temperature = record.temperature_value().and_then(|value| {
            let exact = exact_decimal(value);
            if exact.is_none() {
                warn!(
                    id = record.id(),
                    row = record.row_number(),
                    value,
                    "Temperature has no decimal form, storing without it"
                );
            }
            exact
        });

        let geo = record.geo();
        Self {
            id: record.id().to_string(),
            file_name: record.file_name().to_string(),
            row_number: record.row_number(),
            kind: record.kind(),
            temperature,
            description: record.description().to_string(),
            detected_at: record.detected_at(),
            region: geo.map(|g| g.region.clone()),
            country: geo.map(|g| g.country.clone()),
            state: geo.map(|g| g.state.clone()),
            city: geo.map(|g| g.city.clone()),
            month: geo.map(|g| g.month.clone()),
            day: geo.map(|g| g.day.clone()),
            year: geo.map(|g| g.year.clone()),
            location: record.location(),
        }
    }
}

/// Structured-record store for anomaly entries.
///
/// `batch_put` gives no atomicity guarantee: an error may leave part of
/// the batch written.
#[async_trait]
pub trait AnomalyStore: Send + Sync {
    async fn batch_put(&self, items: &[StoredAnomaly]) -> Result<()>;

    async fn put(&self, item: &StoredAnomaly) -> Result<()> {
        self.batch_put(std::slice::from_ref(item)).await
    }

    /// Up to `limit` entries in insertion order, all when `None`.
    async fn scan(&self, limit: Option<usize>) -> Result<Vec<StoredAnomaly>>;
}

/// Newline-delimited JSON file, one entry per line.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file (and its directory) if missing; `true` when created.
    pub async fn ensure(&self) -> Result<bool> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::File::create(&self.path).await?;
        Ok(true)
    }
}

#[async_trait]
impl AnomalyStore for JsonLinesStore {
    async fn batch_put(&self, items: &[StoredAnomaly]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let mut buffer = String::new();
        for item in items {
            buffer.push_str(&serde_json::to_string(item)?);
            buffer.push('\n');
        }

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(buffer.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn scan(&self, limit: Option<usize>) -> Result<Vec<StoredAnomaly>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(limit.unwrap_or(usize::MAX))
            .map(|line| serde_json::from_str(line).map_err(ProcessingError::from))
            .collect()
    }
}

/// In-process store with switchable write failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<Vec<StoredAnomaly>>,
    failures_remaining: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` calls to `batch_put`.
    pub fn fail_next(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Fail every write from now on.
    pub fn fail_always(&self) {
        self.fail_next(usize::MAX);
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn items(&self) -> Vec<StoredAnomaly> {
        self.items.lock().map(|i| i.clone()).unwrap_or_default()
    }

    fn take_failure(&self) -> bool {
        self.failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                match n {
                    0 => None,
                    usize::MAX => Some(usize::MAX),
                    n => Some(n - 1),
                }
            })
            .is_ok()
    }
}

#[async_trait]
impl AnomalyStore for MemoryStore {
    async fn batch_put(&self, items: &[StoredAnomaly]) -> Result<()> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            return Err(ProcessingError::Persistence(
                "store unavailable".to_string(),
            ));
        }

        let mut stored = self
            .items
            .lock()
            .map_err(|_| ProcessingError::Persistence("store lock poisoned".to_string()))?;
        stored.extend_from_slice(items);
        Ok(())
    }

    async fn scan(&self, limit: Option<usize>) -> Result<Vec<StoredAnomaly>> {
        let stored = self
            .items
            .lock()
            .map_err(|_| ProcessingError::Persistence("store lock poisoned".to_string()))?;
        Ok(stored
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}
