//! Model Module - Risk scoring
//!
//! - `scorer.rs` - `ScoringStrategy` trait, `RiskScore`, `RiskScorer`
//! - `rule.rs` - weighted-feature rule strategy
//! - `predictor.rs` - strategy backed by a prediction function
//! - `artifact.rs` - linear model artifact (JSON, checksummed)

pub mod scorer;
pub mod rule;
pub mod predictor;
pub mod artifact;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::logic::config::ScoringConfig;

pub use artifact::{LinearModel, ModelError};
pub use predictor::{ModelBasedScorer, Prediction};
pub use rule::RuleBasedScorer;
pub use scorer::{RiskScore, RiskScorer, ScoreOutcome, ScoreStatus, ScoringError, ScoringStrategy};

/// Build the strategy selected in the engine config
pub fn strategy_from_config(config: &ScoringConfig) -> Result<Arc<dyn ScoringStrategy>, ModelError> {
    match config {
        ScoringConfig::Rule { weights, bias } => Ok(Arc::new(RuleBasedScorer::new(weights.clone(), *bias))),
        ScoringConfig::Model { artifact_path, sha256 } => Ok(Arc::new(ModelBasedScorer::from_artifact(
            artifact_path,
            sha256.as_deref(),
        )?)),
    }
}
