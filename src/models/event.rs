use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};

/// Arrival of an object in a storage container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    pub container: String,
    pub object_key: String,
}

#[derive(Deserialize)]
struct Notification {
    #[serde(rename = "Records", default)]
    records: Vec<NotificationRecord>,
}

#[derive(Deserialize)]
struct NotificationRecord {
    s3: NotificationEntity,
}

#[derive(Deserialize)]
struct NotificationEntity {
    bucket: NamedEntity,
    object: KeyedEntity,
}

#[derive(Deserialize)]
struct NamedEntity {
    name: String,
}

#[derive(Deserialize)]
struct KeyedEntity {
    key: String,
}

impl StorageEvent {
    pub fn new(container: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            object_key: object_key.into(),
        }
    }

    /// Read the first record of an S3-style bucket notification
    /// (`Records[0].s3.bucket.name`, `Records[0].s3.object.key`).
    pub fn from_notification_json(json: &str) -> Result<Self> {
        let notification: Notification = serde_json::from_str(json)?;
        let record = notification.records.into_iter().next().ok_or_else(|| {
            ProcessingError::InvalidEvent("notification contains no records".to_string())
        })?;

        Ok(Self {
            container: record.s3.bucket.name,
            object_key: record.s3.object.key,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    Success,
    Failure,
}

/// Result reported back to whatever triggered the invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationOutcome {
    pub status: InvocationStatus,
    pub container: String,
    pub object_key: String,
    pub rows_processed: usize,
    pub anomalies_found: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl InvocationOutcome {
    pub fn success(event: &StorageEvent, rows_processed: usize, anomalies_found: usize) -> Self {
        Self {
            status: InvocationStatus::Success,
            container: event.container.clone(),
            object_key: event.object_key.clone(),
            rows_processed,
            anomalies_found,
            error: None,
        }
    }

    pub fn failure(event: &StorageEvent, error: impl Into<String>) -> Self {
        Self {
            status: InvocationStatus::Failure,
            container: event.container.clone(),
            object_key: event.object_key.clone(),
            rows_processed: 0,
            anomalies_found: 0,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == InvocationStatus::Success
    }
}
