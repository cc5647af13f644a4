//! Inbound reading payloads
//!
//! Single readings use `maintai_core::RawReading` directly. Gateways that
//! push one message per machine send the batch shape below; field names
//! differ between PLC vendors, hence the aliases.

use serde::{Deserialize, Serialize};
use validator::Validate;

use maintai_core::{RawReading, SubmitOutcome};

/// One machine, many sensors, one timestamp
#[derive(Debug, Deserialize, Validate)]
pub struct BatchReadingsRequest {
    #[serde(alias = "machine_id", alias = "device_id", alias = "asset_id")]
    #[validate(length(min = 1, max = 128))]
    pub equipment_id: String,

    /// RFC 3339 or epoch milliseconds; receive time when absent
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,

    #[serde(alias = "measurements", alias = "readings", alias = "data")]
    #[validate(length(min = 1, max = 256))]
    pub sensors: Vec<SensorValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorValue {
    #[serde(default, alias = "id")]
    pub sensor_id: Option<String>,

    #[serde(default, alias = "type", alias = "parameter", alias = "measurement_type")]
    pub metric_name: Option<String>,

    #[serde(default, alias = "reading", alias = "measurement")]
    pub value: Option<serde_json::Value>,

    #[serde(default)]
    pub unit: Option<String>,
}

impl BatchReadingsRequest {
    /// One raw reading per sensor, sharing the batch timestamp
    pub fn into_readings(self, default_timestamp: serde_json::Value) -> Vec<(SensorValue, RawReading)> {
        let timestamp = self.timestamp.unwrap_or(default_timestamp);
        self.sensors
            .into_iter()
            .map(|sensor| {
                let raw = RawReading {
                    equipment_id: Some(self.equipment_id.clone()),
                    timestamp: Some(timestamp.clone()),
                    metric_name: sensor.metric_name.clone(),
                    value: sensor.value.clone(),
                };
                (sensor, raw)
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct SensorOutcome {
    pub sensor_id: Option<String>,
    pub metric_name: Option<String>,
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
}

#[derive(Debug, Serialize)]
pub struct BatchReadingsResponse {
    pub equipment_id: String,
    pub accepted: usize,
    pub rejected: usize,
    pub results: Vec<SensorOutcome>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitParams {
    /// Per-request pipeline deadline
    pub deadline_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_aliases() {
        let req: BatchReadingsRequest = serde_json::from_value(serde_json::json!({
            "device_id": "press-04",
            "measurements": [
                {"id": "s1", "parameter": "temp", "reading": 71.5, "unit": "C"},
                {"sensor_id": "s2", "type": "vibration", "value": "3.2"}
            ]
        }))
        .unwrap();

        assert_eq!(req.equipment_id, "press-04");
        assert!(req.validate().is_ok());

        let readings = req.into_readings(serde_json::json!("2024-06-01T10:00:00Z"));
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].0.sensor_id.as_deref(), Some("s1"));
        assert_eq!(readings[0].1.metric_name.as_deref(), Some("temp"));
        assert_eq!(readings[1].1.timestamp, Some(serde_json::json!("2024-06-01T10:00:00Z")));
    }

    #[test]
    fn test_empty_batch_invalid() {
        let req: BatchReadingsRequest = serde_json::from_value(serde_json::json!({
            "machine_id": "press-04",
            "sensors": []
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }
}
