//! Linear model artifact
//!
//! Trained offline (logistic regression on min/max-scaled features) and
//! shipped as JSON:
//!
//! ```json
//! {
//!   "name": "press-bearing", "version": "2024.05",
//!   "feature_version": 1, "layout_hash": 1234567890,
//!   "features": [ { "name": "abs_zscore", "weight": 1.8, "min": 0.0, "max": 6.0 } ],
//!   "intercept": -2.5, "confidence": 0.9
//! }
//! ```
//!
//! Loading verifies the SHA-256 of the file when one is configured and the
//! feature layout the model was trained against.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::predictor::Prediction;
use super::scorer::ScoringError;
use crate::logic::features::layout::{feature_index, validate_layout, LayoutMismatchError};
use crate::logic::features::FeatureVector;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot read model {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse model: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error(transparent)]
    LayoutMismatch(#[from] LayoutMismatchError),

    #[error("invalid model: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFeature {
    pub name: String,
    pub weight: f64,
    /// Training minimum, for min/max scaling
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub name: String,
    #[serde(default)]
    pub version: String,
    pub feature_version: u8,
    /// Layout hash at training time; checked when present
    #[serde(default)]
    pub layout_hash: Option<u32>,
    pub features: Vec<ModelFeature>,
    #[serde(default)]
    pub intercept: f64,
    /// Confidence reported with every prediction
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

impl LinearModel {
    pub fn load(path: &Path, expected_sha256: Option<&str>) -> Result<Self, ModelError> {
        let data = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_bytes(&data, expected_sha256)?;
        log::info!(
            "Loaded model '{}' v{} ({} features) from {}",
            model.name,
            model.version,
            model.features.len(),
            path.display()
        );
        Ok(model)
    }

    pub fn from_bytes(data: &[u8], expected_sha256: Option<&str>) -> Result<Self, ModelError> {
        if let Some(expected) = expected_sha256 {
            let actual = sha256_hex(data);
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                return Err(ModelError::ChecksumMismatch {
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        let model: LinearModel = serde_json::from_slice(data)?;
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        match self.layout_hash {
            Some(hash) => validate_layout(self.feature_version, hash)?,
            None => validate_layout(self.feature_version, crate::logic::features::layout_hash())?,
        }

        if self.features.is_empty() {
            return Err(ModelError::Invalid("model has no features".to_string()));
        }
        for f in &self.features {
            if feature_index(&f.name).is_none() {
                return Err(ModelError::Invalid(format!("unknown feature '{}'", f.name)));
            }
            if !(f.max > f.min) || !f.weight.is_finite() {
                return Err(ModelError::Invalid(format!("feature '{}' has invalid scaling", f.name)));
            }
        }
        if !self.intercept.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(ModelError::Invalid("intercept/confidence out of range".to_string()));
        }
        Ok(())
    }

    /// Sigmoid of the scaled linear combination
    pub fn predict(&self, fv: &FeatureVector) -> Result<Prediction, ScoringError> {
        fv.validate()?;

        let mut z = self.intercept;
        for f in &self.features {
            let raw = fv
                .get(&f.name)
                .filter(|v| v.is_finite())
                .ok_or_else(|| ScoringError::MissingFeature(f.name.clone()))?;
            let scaled = ((raw - f.min) / (f.max - f.min)).clamp(0.0, 1.0);
            z += f.weight * scaled;
        }

        Ok(Prediction {
            score: 1.0 / (1.0 + (-z).exp()),
            confidence: self.confidence,
        })
    }
}
