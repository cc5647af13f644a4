//! Rule-based scoring
//!
//! `clamp(bias + Σ weight × feature, 0, 1)`. Confidence is the share of
//! absolute weight whose feature was present and finite. Terms adding more
//! than `FACTOR_MIN_CONTRIBUTION` are reported as contributing factors.

use std::collections::BTreeMap;

use super::scorer::{scored, RiskScore, ScoringError, ScoringStrategy};
use crate::logic::features::layout::{ABS_ZSCORE, LIMIT_EXCESS, NORMALIZED_SLOPE, OPERATING_POSITION};
use crate::logic::features::FeatureVector;

pub const STRATEGY_NAME: &str = "rule_based";

pub const FACTOR_MIN_CONTRIBUTION: f64 = 0.15;
const MAX_FACTORS: usize = 3;

/// Default weights
///
/// A reading at the top of its operating range scores 0.25, each unit of
/// relative excess beyond it adds 2.0, a 3σ jump adds 0.3 and a trend that
/// crosses the whole range within one window adds 1.0.
pub fn default_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([
        (OPERATING_POSITION.to_string(), 0.25),
        (ABS_ZSCORE.to_string(), 0.1),
        (LIMIT_EXCESS.to_string(), 2.0),
        (NORMALIZED_SLOPE.to_string(), 1.0),
    ])
}

#[derive(Debug, Clone)]
pub struct RuleBasedScorer {
    weights: BTreeMap<String, f64>,
    bias: f64,
}

impl RuleBasedScorer {
    pub fn new(weights: BTreeMap<String, f64>, bias: f64) -> Self {
        Self { weights, bias }
    }
}

impl Default for RuleBasedScorer {
    fn default() -> Self {
        Self::new(default_weights(), 0.0)
    }
}

impl ScoringStrategy for RuleBasedScorer {
    fn name(&self) -> &str {
        STRATEGY_NAME
    }

    fn score(&self, features: &FeatureVector) -> Result<RiskScore, ScoringError> {
        let total_weight: f64 = self.weights.values().map(|w| w.abs()).sum();
        if total_weight == 0.0 {
            return Err(ScoringError::Misconfigured("all rule weights are zero".to_string()));
        }

        let mut sum = self.bias;
        let mut present_weight = 0.0;
        let mut terms: Vec<(&str, f64)> = Vec::new();
        for (name, weight) in &self.weights {
            match features.get(name) {
                Some(v) if v.is_finite() => {
                    sum += weight * v;
                    present_weight += weight.abs();
                    terms.push((name.as_str(), weight * v));
                }
                _ => {}
            }
        }

        if present_weight == 0.0 {
            return Err(ScoringError::MissingFeature(
                self.weights.keys().cloned().collect::<Vec<_>>().join(", "),
            ));
        }

        terms.retain(|(_, contribution)| *contribution > FACTOR_MIN_CONTRIBUTION);
        terms.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut score = scored(features, sum.clamp(0.0, 1.0), present_weight / total_weight, STRATEGY_NAME);
        score.contributing_factors = terms
            .into_iter()
            .take(MAX_FACTORS)
            .map(|(name, _)| describe(features.metric_name(), name))
            .collect();
        Ok(score)
    }
}

fn describe(metric: &str, feature: &str) -> String {
    match feature {
        NORMALIZED_SLOPE => format!("rising {} trend", metric),
        LIMIT_EXCESS => format!("{} outside operating range", metric),
        ABS_ZSCORE => format!("{} deviates from recent mean", metric),
        OPERATING_POSITION => format!("{} high in operating range", metric),
        other => format!("{} {}", metric, other),
    }
}
