//! Risk Scorer
//!
//! `ScoringStrategy` is the only seam between features and a risk number.
//! `RiskScorer` wraps the configured strategy and guarantees one bounded
//! `RiskScore` per `FeatureVector`:
//!
//! | Input / outcome              | score            | confidence | status              |
//! |------------------------------|------------------|------------|---------------------|
//! | insufficient history         | 0                | 0          | InsufficientHistory |
//! | strategy Ok, value in [0,1]  | strategy value   | strategy   | Scored              |
//! | strategy error / bad output  | `fallback_score` | 0          | Fallback            |
//!
//! Only `Scored` results carry contributing factors and a time-to-failure
//! bucket.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::features::{FeatureVector, LayoutMismatchError};

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStatus {
    Scored,
    InsufficientHistory,
    Fallback,
}

impl ScoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreStatus::Scored => "scored",
            ScoreStatus::InsufficientHistory => "insufficient_history",
            ScoreStatus::Fallback => "fallback",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scored" => Some(ScoreStatus::Scored),
            "insufficient_history" => Some(ScoreStatus::InsufficientHistory),
            "fallback" => Some(ScoreStatus::Fallback),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub equipment_id: String,
    pub metric_name: String,
    pub timestamp: DateTime<Utc>,
    /// Failure risk in [0, 1]
    pub score: f64,
    /// Trust in `score`, in [0, 1]; 0 never moves alert state
    pub confidence: f64,
    pub status: ScoreStatus,
    /// Name of the strategy that produced the score
    pub strategy: String,
    /// What pushed the score up, strongest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributing_factors: Vec<String>,
    /// Failure horizon bucket; `None` below the lowest bucket
    #[serde(default)]
    pub time_to_failure_hours: Option<u32>,
}

impl RiskScore {
    fn for_vector(fv: &FeatureVector, score: f64, confidence: f64, status: ScoreStatus, strategy: &str) -> Self {
        Self {
            equipment_id: fv.equipment_id().to_string(),
            metric_name: fv.metric_name().to_string(),
            timestamp: fv.timestamp(),
            score,
            confidence,
            status,
            strategy: strategy.to_string(),
            contributing_factors: Vec::new(),
            time_to_failure_hours: None,
        }
    }
}

/// Score → failure horizon: 24 h above 0.7, 72 h above 0.5, a week above 0.3
pub fn time_to_failure_hours(score: f64) -> Option<u32> {
    if score > 0.7 {
        Some(24)
    } else if score > 0.5 {
        Some(72)
    } else if score > 0.3 {
        Some(168)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("feature '{0}' missing from vector")]
    MissingFeature(String),

    #[error("strategy produced invalid output: {0}")]
    InvalidOutput(String),

    #[error(transparent)]
    LayoutMismatch(#[from] LayoutMismatchError),

    #[error("scoring backend unavailable: {0}")]
    Unavailable(String),

    #[error("strategy panicked: {0}")]
    Panicked(String),

    #[error("strategy misconfigured: {0}")]
    Misconfigured(String),
}

// ============================================================================
// STRATEGY TRAIT
// ============================================================================

/// Pluggable scoring strategy
///
/// Implementations must be deterministic for a given vector. The returned
/// score's `status` is ignored; `RiskScorer` assigns it.
pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn score(&self, features: &FeatureVector) -> Result<RiskScore, ScoringError>;
}

// ============================================================================
// RISK SCORER
// ============================================================================

/// Result of one scoring pass; `error` is set when the fallback was used
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub score: RiskScore,
    pub error: Option<ScoringError>,
}

#[derive(Clone)]
pub struct RiskScorer {
    strategy: Arc<dyn ScoringStrategy>,
    fallback_score: f64,
}

impl RiskScorer {
    pub fn new(strategy: Arc<dyn ScoringStrategy>, fallback_score: f64) -> Self {
        Self {
            strategy,
            fallback_score: fallback_score.clamp(0.0, 1.0),
        }
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub fn score(&self, fv: &FeatureVector) -> ScoreOutcome {
        let name = self.strategy.name();

        if fv.is_insufficient() {
            return ScoreOutcome {
                score: RiskScore::for_vector(fv, 0.0, 0.0, ScoreStatus::InsufficientHistory, name),
                error: None,
            };
        }

        let result = catch_unwind(AssertUnwindSafe(|| self.strategy.score(fv)))
            .unwrap_or_else(|panic| Err(ScoringError::Panicked(panic_message(panic.as_ref()))))
            .and_then(check_output);

        match result {
            Ok(raw) => {
                let mut score = RiskScore::for_vector(fv, raw.score, raw.confidence, ScoreStatus::Scored, name);
                score.contributing_factors = raw.contributing_factors;
                score.time_to_failure_hours = time_to_failure_hours(raw.score);
                ScoreOutcome { score, error: None }
            }
            Err(e) => {
                log::warn!(
                    "Scoring {}/{} with '{}' failed, using fallback {}: {}",
                    fv.equipment_id(),
                    fv.metric_name(),
                    name,
                    self.fallback_score,
                    e
                );
                ScoreOutcome {
                    score: RiskScore::for_vector(fv, self.fallback_score, 0.0, ScoreStatus::Fallback, name),
                    error: Some(e),
                }
            }
        }
    }
}

fn check_output(score: RiskScore) -> Result<RiskScore, ScoringError> {
    let unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
    if !unit(score.score) {
        return Err(ScoringError::InvalidOutput(format!("score {} outside [0, 1]", score.score)));
    }
    if !unit(score.confidence) {
        return Err(ScoringError::InvalidOutput(format!(
            "confidence {} outside [0, 1]",
            score.confidence
        )));
    }
    Ok(score)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Build a `RiskScore` for `fv` (strategy implementations)
pub fn scored(fv: &FeatureVector, score: f64, confidence: f64, strategy: &str) -> RiskScore {
    RiskScore::for_vector(fv, score, confidence, ScoreStatus::Scored, strategy)
}
