//! Reading types
//!
//! `RawReading` accepts the field names the various PLC gateways send
//! (`machine_id`, `device_id`, `type`, `parameter`, `reading`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical, validated telemetry reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub equipment_id: String,
    pub timestamp: DateTime<Utc>,
    pub metric_name: String,
    pub value: f64,
}

impl Reading {
    /// Same stream, same instant, same value
    pub fn is_duplicate_of(&self, other: &Reading) -> bool {
        self.equipment_id == other.equipment_id
            && self.metric_name == other.metric_name
            && self.timestamp == other.timestamp
            && self.value == other.value
    }
}

/// Untrusted inbound reading
///
/// Every field is optional so that a missing field becomes a typed
/// validation error instead of a deserialization failure.
/// `timestamp`: RFC 3339 string or epoch milliseconds.
/// `value`: JSON number or numeric string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(default, alias = "machine_id", alias = "device_id", alias = "asset_id")]
    pub equipment_id: Option<String>,

    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,

    #[serde(default, alias = "type", alias = "parameter", alias = "sensor_type")]
    pub metric_name: Option<String>,

    #[serde(default, alias = "reading", alias = "measurement")]
    pub value: Option<serde_json::Value>,
}

impl RawReading {
    /// Build a fully-populated raw reading (Rust callers, tests, replay)
    pub fn new(
        equipment_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        metric_name: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            equipment_id: Some(equipment_id.into()),
            timestamp: Some(serde_json::Value::String(timestamp.to_rfc3339())),
            metric_name: Some(metric_name.into()),
            value: serde_json::Number::from_f64(value).map(serde_json::Value::Number),
        }
    }
}
