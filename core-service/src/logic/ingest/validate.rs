//! Reading Validation
//!
//! Stateless checks (`validate`) run before any lock is taken; the stream
//! order check (`check_sequence`) runs under the per-equipment lock against
//! the last accepted reading of the stream.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::reading::{RawReading, Reading};
use super::schema::MetricSchema;
use crate::constants::MAX_EQUIPMENT_ID_LEN;
use crate::logic::config::EngineConfig;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("missing required field `{field}`")]
    MissingField { field: String },

    #[error("equipment id is longer than {max} characters")]
    EquipmentIdTooLong { max: usize },

    #[error("value is not numeric: {raw}")]
    NonNumeric { raw: String },

    #[error("value is not a finite number")]
    NonFinite,

    #[error("invalid timestamp: {raw}")]
    InvalidTimestamp { raw: String },

    #[error("unknown metric `{metric}`")]
    UnknownMetric { metric: String },

    #[error("{metric} value {value} outside valid range [{min}, {max}]")]
    OutOfRange { metric: String, value: f64, min: f64, max: f64 },

    #[error("reading at {timestamp} is older than the {max_age_secs}s staleness window")]
    Stale { timestamp: DateTime<Utc>, max_age_secs: i64 },

    #[error("reading at {timestamp} is more than {max_skew_secs}s in the future")]
    FromFuture { timestamp: DateTime<Utc>, max_skew_secs: i64 },

    #[error("reading at {timestamp} is older than the last accepted reading at {last}")]
    OutOfOrder { timestamp: DateTime<Utc>, last: DateTime<Utc> },

    #[error("duplicate reading at {timestamp}")]
    Duplicate { timestamp: DateTime<Utc> },
}

fn missing(field: &str) -> ValidationError {
    ValidationError::MissingField { field: field.to_string() }
}

// ============================================================================
// FIELD PARSING
// ============================================================================

fn parse_value(raw: &serde_json::Value) -> Result<f64, ValidationError> {
    let value = match raw {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ValidationError::NonNumeric { raw: n.to_string() })?,
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::NonNumeric { raw: s.clone() })?,
        serde_json::Value::Null => return Err(missing("value")),
        other => return Err(ValidationError::NonNumeric { raw: other.to_string() }),
    };

    if !value.is_finite() {
        return Err(ValidationError::NonFinite);
    }
    Ok(value)
}

/// RFC 3339, naive ISO (UTC) or epoch milliseconds; truncated to milliseconds
pub fn parse_timestamp(raw: &serde_json::Value) -> Result<DateTime<Utc>, ValidationError> {
    let invalid = || ValidationError::InvalidTimestamp { raw: raw.to_string() };

    let parsed = match raw {
        serde_json::Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|_| {
                    // Gateways that send naive ISO timestamps mean UTC
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
                })
                .map_err(|_| invalid())?
        }
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(invalid)?,
        serde_json::Value::Null => return Err(missing("timestamp")),
        _ => return Err(invalid()),
    };

    // Stores keep millisecond precision; normalize here so order and
    // duplicate checks agree with what comes back from the store.
    DateTime::from_timestamp_millis(parsed.timestamp_millis()).ok_or_else(invalid)
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Validate and normalize a raw reading
pub fn validate(
    raw: &RawReading,
    schema: &MetricSchema,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<Reading, ValidationError> {
    let equipment_id = raw
        .equipment_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| missing("equipment_id"))?;
    if equipment_id.chars().count() > MAX_EQUIPMENT_ID_LEN {
        return Err(ValidationError::EquipmentIdTooLong { max: MAX_EQUIPMENT_ID_LEN });
    }

    let raw_metric = raw
        .metric_name
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| missing("metric_name"))?;
    let timestamp = parse_timestamp(raw.timestamp.as_ref().ok_or_else(|| missing("timestamp"))?)?;
    let value = parse_value(raw.value.as_ref().ok_or_else(|| missing("value"))?)?;

    let spec = schema
        .resolve(raw_metric)
        .ok_or_else(|| ValidationError::UnknownMetric { metric: raw_metric.trim().to_string() })?;

    if let Some(range) = spec.valid_range {
        if !range.contains(value) {
            return Err(ValidationError::OutOfRange {
                metric: spec.name.clone(),
                value,
                min: range.min,
                max: range.max,
            });
        }
    }

    let max_age = config.staleness_window();
    let oldest = now.checked_sub_signed(max_age).unwrap_or(DateTime::<Utc>::MIN_UTC);
    if timestamp < oldest {
        return Err(ValidationError::Stale {
            timestamp,
            max_age_secs: max_age.num_seconds(),
        });
    }

    let max_skew = config.max_future_skew();
    let latest = now.checked_add_signed(max_skew).unwrap_or(DateTime::<Utc>::MAX_UTC);
    if timestamp > latest {
        return Err(ValidationError::FromFuture {
            timestamp,
            max_skew_secs: max_skew.num_seconds(),
        });
    }

    Ok(Reading {
        equipment_id: equipment_id.to_string(),
        timestamp,
        metric_name: spec.name.clone(),
        value,
    })
}

/// Enforce non-decreasing timestamps per stream and reject exact repeats
pub fn check_sequence(reading: &Reading, last: Option<&Reading>) -> Result<(), ValidationError> {
    let Some(last) = last else {
        return Ok(());
    };

    if reading.timestamp < last.timestamp {
        return Err(ValidationError::OutOfOrder {
            timestamp: reading.timestamp,
            last: last.timestamp,
        });
    }
    if reading.is_duplicate_of(last) {
        return Err(ValidationError::Duplicate { timestamp: reading.timestamp });
    }
    Ok(())
}
