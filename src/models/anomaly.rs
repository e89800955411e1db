use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::constants::UNKNOWN_FIELD;
use crate::utils::decimal::format_reading;
use crate::utils::{MAX_NORMAL_TEMP, MIN_NORMAL_TEMP};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    TemperatureAnomaly,
    ProcessingError,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::TemperatureAnomaly => "temperature_anomaly",
            AnomalyKind::ProcessingError => "processing_error",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic and date fields denormalized from the flagged row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoContext {
    pub region: String,
    pub country: String,
    pub state: String,
    pub city: String,
    pub month: String,
    pub day: String,
    pub year: String,
}

impl GeoContext {
    pub fn unknown() -> Self {
        Self {
            region: UNKNOWN_FIELD.to_string(),
            country: UNKNOWN_FIELD.to_string(),
            state: UNKNOWN_FIELD.to_string(),
            city: UNKNOWN_FIELD.to_string(),
            month: UNKNOWN_FIELD.to_string(),
            day: UNKNOWN_FIELD.to_string(),
            year: UNKNOWN_FIELD.to_string(),
        }
    }

    /// `"{city}, {state}, {country}, {region}"`
    pub fn location(&self) -> String {
        format!(
            "{}, {}, {}, {}",
            self.city, self.state, self.country, self.region
        )
    }
}

/// An entry produced by a scan or by a failed invocation.
///
/// Records are immutable once built; the scan owns them until they are
/// handed to the batch writer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRecord {
    id: String,
    file_name: String,
    row_number: Option<u64>,
    kind: AnomalyKind,
    temperature: Option<f64>,
    description: String,
    detected_at: DateTime<Utc>,
    geo: Option<GeoContext>,
}

impl AnomalyRecord {
    pub fn temperature(
        id: String,
        file_name: &str,
        row_number: u64,
        value: f64,
        geo: GeoContext,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            file_name: file_name.to_string(),
            row_number: Some(row_number),
            kind: AnomalyKind::TemperatureAnomaly,
            temperature: Some(value),
            description: format!(
                "Temperature value {} is outside normal range ({} to {})",
                format_reading(value),
                MIN_NORMAL_TEMP,
                MAX_NORMAL_TEMP
            ),
            detected_at,
            geo: Some(geo),
        }
    }

    pub fn processing_error(
        id: String,
        file_name: &str,
        description: impl Into<String>,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            file_name: file_name.to_string(),
            row_number: None,
            kind: AnomalyKind::ProcessingError,
            temperature: None,
            description: description.into(),
            detected_at,
            geo: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn row_number(&self) -> Option<u64> {
        self.row_number
    }

    pub fn kind(&self) -> AnomalyKind {
        self.kind
    }

    pub fn temperature_value(&self) -> Option<f64> {
        self.temperature
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }

    pub fn geo(&self) -> Option<&GeoContext> {
        self.geo.as_ref()
    }

    pub fn location(&self) -> Option<String> {
        self.geo.as_ref().map(GeoContext::location)
    }
}
