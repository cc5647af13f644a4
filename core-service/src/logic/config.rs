//! Engine Configuration
//!
//! One immutable `EngineConfig` is built at startup, validated once and then
//! shared as `Arc<EngineConfig>` with every component. Nothing in the engine
//! reads configuration from globals or the environment.
//!
//! Every field has a default, so a JSON file only needs the keys it changes:
//!
//! ```json
//! { "warn_threshold": 0.65, "consecutive_count": 2,
//!   "scoring": { "strategy": "model", "artifact_path": "models/press.json" } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants;
use crate::logic::alert::AlertPolicy;
use crate::logic::ingest::schema::{MetricSchema, MetricSpec};
use crate::logic::model::rule;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SCORING STRATEGY SELECTION
// ============================================================================

/// Which scoring strategy the engine builds when none is injected
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ScoringConfig {
    /// Weighted linear combination of named features
    Rule {
        #[serde(default = "rule::default_weights")]
        weights: BTreeMap<String, f64>,
        #[serde(default)]
        bias: f64,
    },

    /// Linear model artifact loaded from disk
    Model {
        artifact_path: PathBuf,
        /// Expected SHA-256 of the artifact file (hex)
        #[serde(default)]
        sha256: Option<String>,
    },
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig::Rule {
            weights: rule::default_weights(),
            bias: 0.0,
        }
    }
}

// ============================================================================
// ENGINE CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub warn_threshold: f64,
    pub crit_threshold: f64,
    pub hysteresis_margin: f64,
    /// Consecutive scores (k) required for a level change
    pub consecutive_count: usize,

    /// Readings per feature window; fewer means insufficient history
    pub window_size: usize,
    /// Optional time bound on the window, counted back from the new reading
    pub window_span_secs: Option<u64>,

    pub staleness_window_secs: u64,
    pub max_future_skew_secs: u64,

    pub store_timeout_ms: u64,
    pub fallback_score: f64,
    pub notify_queue_capacity: usize,

    pub metrics: Vec<MetricSpec>,
    pub scoring: ScoringConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            warn_threshold: constants::DEFAULT_WARN_THRESHOLD,
            crit_threshold: constants::DEFAULT_CRIT_THRESHOLD,
            hysteresis_margin: constants::DEFAULT_HYSTERESIS_MARGIN,
            consecutive_count: constants::DEFAULT_CONSECUTIVE_COUNT,
            window_size: constants::DEFAULT_WINDOW_SIZE,
            window_span_secs: None,
            staleness_window_secs: constants::DEFAULT_STALENESS_WINDOW_SECS,
            max_future_skew_secs: constants::DEFAULT_MAX_FUTURE_SKEW_SECS,
            store_timeout_ms: constants::DEFAULT_STORE_TIMEOUT_MS,
            fallback_score: constants::DEFAULT_FALLBACK_SCORE,
            notify_queue_capacity: constants::DEFAULT_NOTIFY_QUEUE_CAPACITY,
            metrics: MetricSchema::default_specs(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig = serde_json::from_slice(&data)?;
        config.validate()?;
        log::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = |name: &str, v: f64| {
            if v.is_finite() && (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{} must be within [0, 1], got {}", name, v)))
            }
        };

        unit("warn_threshold", self.warn_threshold)?;
        unit("crit_threshold", self.crit_threshold)?;
        unit("hysteresis_margin", self.hysteresis_margin)?;
        unit("fallback_score", self.fallback_score)?;

        if self.warn_threshold >= self.crit_threshold {
            return Err(ConfigError::Invalid(format!(
                "warn_threshold ({}) must be below crit_threshold ({})",
                self.warn_threshold, self.crit_threshold
            )));
        }
        if self.hysteresis_margin >= self.warn_threshold {
            return Err(ConfigError::Invalid(
                "hysteresis_margin must be smaller than warn_threshold".to_string(),
            ));
        }
        if self.consecutive_count == 0 {
            return Err(ConfigError::Invalid("consecutive_count must be at least 1".to_string()));
        }
        if self.window_size == 0 {
            return Err(ConfigError::Invalid("window_size must be at least 1".to_string()));
        }
        if self.window_span_secs == Some(0) {
            return Err(ConfigError::Invalid("window_span_secs must be positive".to_string()));
        }
        for (name, secs) in [
            ("window_span_secs", self.window_span_secs.unwrap_or(0)),
            ("staleness_window_secs", self.staleness_window_secs),
            ("max_future_skew_secs", self.max_future_skew_secs),
        ] {
            if secs > constants::MAX_DURATION_SECS {
                return Err(ConfigError::Invalid(format!(
                    "{} must be at most {}, got {}",
                    name,
                    constants::MAX_DURATION_SECS,
                    secs
                )));
            }
        }
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::Invalid("store_timeout_ms must be positive".to_string()));
        }
        if self.notify_queue_capacity == 0 {
            return Err(ConfigError::Invalid("notify_queue_capacity must be positive".to_string()));
        }

        MetricSchema::new(self.metrics.clone()).map_err(ConfigError::Invalid)?;

        if let ScoringConfig::Rule { weights, bias } = &self.scoring {
            if weights.is_empty() {
                return Err(ConfigError::Invalid("rule scoring needs at least one weight".to_string()));
            }
            if !bias.is_finite() || weights.values().any(|w| !w.is_finite()) {
                return Err(ConfigError::Invalid("rule weights must be finite".to_string()));
            }
        }

        Ok(())
    }

    pub fn alert_policy(&self) -> AlertPolicy {
        AlertPolicy {
            warn_threshold: self.warn_threshold,
            crit_threshold: self.crit_threshold,
            hysteresis_margin: self.hysteresis_margin,
            consecutive_count: self.consecutive_count,
        }
    }

    pub fn staleness_window(&self) -> chrono::Duration {
        bounded_secs(self.staleness_window_secs)
    }

    pub fn max_future_skew(&self) -> chrono::Duration {
        bounded_secs(self.max_future_skew_secs)
    }

    pub fn window_span(&self) -> Option<chrono::Duration> {
        self.window_span_secs.map(bounded_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Seconds as a duration, capped at `MAX_DURATION_SECS`
fn bounded_secs(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(constants::MAX_DURATION_SECS) as i64)
}
