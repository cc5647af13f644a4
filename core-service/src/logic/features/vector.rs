//! Feature Vector - Input of every scoring strategy
//!
//! **Versioned, immutable once built**
//!
//! A vector is keyed by the reading that triggered it and carries the
//! layout version + hash it was computed with, so a strategy can refuse
//! vectors from a layout it does not understand.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::layout::{
    feature_index, layout_hash, validate_layout, LayoutMismatchError, FEATURE_VERSION, LAST_VALUE,
    SAMPLE_COUNT,
};

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    equipment_id: String,
    metric_name: String,
    timestamp: DateTime<Utc>,
    /// Feature layout version
    version: u8,
    /// CRC32 of the feature layout
    layout_hash: u32,
    sample_count: usize,
    insufficient_history: bool,
    features: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn builder(
        equipment_id: impl Into<String>,
        metric_name: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> FeatureVectorBuilder {
        FeatureVectorBuilder {
            vector: FeatureVector {
                equipment_id: equipment_id.into(),
                metric_name: metric_name.into(),
                timestamp,
                version: FEATURE_VERSION,
                layout_hash: layout_hash(),
                sample_count: 0,
                insufficient_history: false,
                features: BTreeMap::new(),
            },
        }
    }

    pub fn equipment_id(&self) -> &str {
        &self.equipment_id
    }

    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn layout_hash(&self) -> u32 {
        self.layout_hash
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// True when the window held fewer than `window_size` readings
    pub fn is_insufficient(&self) -> bool {
        self.insufficient_history
    }

    /// Feature by name; `None` when absent
    pub fn get(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }

    pub fn features(&self) -> &BTreeMap<String, f64> {
        &self.features
    }

    /// Values in layout order, absent features as 0
    pub fn to_dense(&self) -> Vec<f64> {
        super::layout::FEATURE_LAYOUT
            .iter()
            .map(|name| self.get(name).unwrap_or(0.0))
            .collect()
    }

    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)
    }

    /// JSON-serializable form for logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "equipment_id": self.equipment_id,
            "metric_name": self.metric_name,
            "timestamp": self.timestamp,
            "feature_version": self.version,
            "layout_hash": format!("{:08x}", self.layout_hash),
            "sample_count": self.sample_count,
            "insufficient_history": self.insufficient_history,
            "features": self.features,
        })
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Only way to assemble a `FeatureVector`
#[derive(Debug, Clone)]
pub struct FeatureVectorBuilder {
    vector: FeatureVector,
}

impl FeatureVectorBuilder {
    /// Set a layout feature; names outside the layout are ignored
    pub fn set(mut self, name: &str, value: f64) -> Self {
        if feature_index(name).is_some() {
            self.vector.features.insert(name.to_string(), value);
        } else {
            log::debug!("Ignoring feature '{}' not in layout v{}", name, FEATURE_VERSION);
        }
        self
    }

    pub fn sample_count(mut self, count: usize) -> Self {
        self.vector.sample_count = count;
        self.vector.features.insert(SAMPLE_COUNT.to_string(), count as f64);
        self
    }

    pub fn last_value(self, value: f64) -> Self {
        self.set(LAST_VALUE, value)
    }

    pub fn insufficient_history(mut self, insufficient: bool) -> Self {
        self.vector.insufficient_history = insufficient;
        self
    }

    /// Override layout metadata (model tooling, tests)
    pub fn layout(mut self, version: u8, hash: u32) -> Self {
        self.vector.version = version;
        self.vector.layout_hash = hash;
        self
    }

    pub fn build(self) -> FeatureVector {
        self.vector
    }
}
