//! Scoring tests

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use super::artifact::{sha256_hex, LinearModel, ModelError, ModelFeature};
use super::*;
use crate::logic::config::ScoringConfig;
use crate::logic::features::layout::*;
use crate::logic::features::FeatureVector;

fn vector(features: &[(&str, f64)]) -> FeatureVector {
    let ts = Utc.with_ymd_and_hms(2024, 2, 2, 2, 2, 2).unwrap();
    features
        .iter()
        .fold(FeatureVector::builder("kiln-3", "temperature", ts).sample_count(10), |b, (n, v)| {
            b.set(n, *v)
        })
        .build()
}

fn insufficient() -> FeatureVector {
    let ts = Utc.with_ymd_and_hms(2024, 2, 2, 2, 2, 2).unwrap();
    FeatureVector::builder("kiln-3", "temperature", ts)
        .sample_count(2)
        .last_value(40.0)
        .insufficient_history(true)
        .build()
}

fn model_json(layout: u32) -> String {
    serde_json::json!({
        "name": "kiln",
        "version": "1",
        "feature_version": FEATURE_VERSION,
        "layout_hash": layout,
        "features": [
            { "name": "abs_zscore", "weight": 4.0, "min": 0.0, "max": 4.0 },
            { "name": "limit_excess", "weight": 4.0, "min": 0.0, "max": 1.0 }
        ],
        "intercept": -4.0,
        "confidence": 0.8
    })
    .to_string()
}

// ============================================================================
// RULE STRATEGY
// ============================================================================

#[test]
fn test_rule_weighted_sum_and_clamp() {
    let scorer = RuleBasedScorer::default();

    let calm = scorer
        .score(&vector(&[
            (OPERATING_POSITION, 0.4),
            (ABS_ZSCORE, 0.5),
            (LIMIT_EXCESS, 0.0),
            (NORMALIZED_SLOPE, 0.0),
        ]))
        .unwrap();
    assert!((calm.score - 0.15).abs() < 1e-9);
    assert_eq!(calm.confidence, 1.0);

    let hot = scorer
        .score(&vector(&[(OPERATING_POSITION, 1.3), (LIMIT_EXCESS, 0.3), (ABS_ZSCORE, 4.0)]))
        .unwrap();
    assert_eq!(hot.score, 1.0);
    // normalized_slope (weight 1.0 of 3.35) missing
    assert!((hot.confidence - 2.35 / 3.35).abs() < 1e-9);
}

#[test]
fn test_rule_reports_strongest_terms() {
    let scorer = RuleBasedScorer::default();

    let calm = scorer
        .score(&vector(&[(OPERATING_POSITION, 0.4), (ABS_ZSCORE, 0.5), (NORMALIZED_SLOPE, 0.0)]))
        .unwrap();
    assert!(calm.contributing_factors.is_empty());

    let hot = scorer
        .score(&vector(&[
            (OPERATING_POSITION, 1.3),
            (LIMIT_EXCESS, 0.3),
            (ABS_ZSCORE, 4.0),
            (NORMALIZED_SLOPE, 0.05),
        ]))
        .unwrap();
    assert_eq!(
        hot.contributing_factors,
        vec![
            "temperature outside operating range".to_string(),
            "temperature deviates from recent mean".to_string(),
            "temperature high in operating range".to_string(),
        ]
    );
}

#[test]
fn test_rule_all_features_missing_is_error() {
    let scorer = RuleBasedScorer::default();
    let err = scorer.score(&vector(&[])).unwrap_err();
    assert!(matches!(err, ScoringError::MissingFeature(_)));
}

#[test]
fn test_rule_nan_feature_lowers_confidence() {
    let weights = BTreeMap::from([(ZSCORE.to_string(), 0.5), (SLOPE.to_string(), 0.5)]);
    let scorer = RuleBasedScorer::new(weights, 0.1);
    let score = scorer.score(&vector(&[(ZSCORE, 1.0), (SLOPE, f64::NAN)])).unwrap();

    assert!((score.score - 0.6).abs() < 1e-9);
    assert_eq!(score.confidence, 0.5);
}

// ============================================================================
// RISK SCORER
// ============================================================================

#[test]
fn test_insufficient_history_skips_strategy() {
    let strategy = ModelBasedScorer::new("never", |_fv: &FeatureVector| -> Result<Prediction, ScoringError> {
        panic!("must not be called")
    });
    let scorer = RiskScorer::new(Arc::new(strategy), 0.0);
    let outcome = scorer.score(&insufficient());

    assert_eq!(outcome.score.status, ScoreStatus::InsufficientHistory);
    assert_eq!(outcome.score.score, 0.0);
    assert_eq!(outcome.score.confidence, 0.0);
    assert!(outcome.error.is_none());
}

#[test]
fn test_scored_results_carry_failure_horizon() {
    let scorer = RiskScorer::new(Arc::new(RuleBasedScorer::default()), 0.9);

    let horizon = |position: f64| {
        scorer
            .score(&vector(&[(OPERATING_POSITION, position), (LIMIT_EXCESS, 0.0)]))
            .score
            .time_to_failure_hours
    };
    // score = 0.25 × position
    assert_eq!(horizon(0.4), None);
    assert_eq!(horizon(1.6), Some(168));
    assert_eq!(horizon(2.4), Some(72));
    assert_eq!(horizon(3.2), Some(24));

    let hot = scorer.score(&vector(&[(OPERATING_POSITION, 1.3), (LIMIT_EXCESS, 0.3)])).score;
    assert_eq!(hot.contributing_factors[0], "temperature outside operating range");

    let outcome = scorer.score(&insufficient());
    assert_eq!(outcome.score.time_to_failure_hours, None);
}

#[test]
fn test_failure_horizon_buckets() {
    assert_eq!(scorer::time_to_failure_hours(0.3), None);
    assert_eq!(scorer::time_to_failure_hours(0.31), Some(168));
    assert_eq!(scorer::time_to_failure_hours(0.5), Some(168));
    assert_eq!(scorer::time_to_failure_hours(0.7), Some(72));
    assert_eq!(scorer::time_to_failure_hours(0.95), Some(24));
}

#[test]
fn test_strategy_error_yields_fallback() {
    let strategy = ModelBasedScorer::new("down", |_fv: &FeatureVector| {
        Err(ScoringError::Unavailable("model server offline".to_string()))
    });
    let scorer = RiskScorer::new(Arc::new(strategy), 0.5);
    let outcome = scorer.score(&vector(&[(ZSCORE, 1.0)]));

    assert_eq!(outcome.score.status, ScoreStatus::Fallback);
    assert_eq!(outcome.score.score, 0.5);
    assert_eq!(outcome.score.confidence, 0.0);
    assert_eq!(outcome.score.time_to_failure_hours, None);
    assert!(matches!(outcome.error, Some(ScoringError::Unavailable(_))));
}

#[test]
fn test_out_of_range_output_yields_fallback() {
    let strategy = ModelBasedScorer::new("wild", |_fv: &FeatureVector| {
        Ok(Prediction { score: 1.7, confidence: 1.0 })
    });
    let outcome = RiskScorer::new(Arc::new(strategy), 0.0).score(&vector(&[(ZSCORE, 1.0)]));

    assert_eq!(outcome.score.status, ScoreStatus::Fallback);
    assert!(matches!(outcome.error, Some(ScoringError::InvalidOutput(_))));

    let strategy = ModelBasedScorer::new("nan", |_fv: &FeatureVector| {
        Ok(Prediction { score: f64::NAN, confidence: 1.0 })
    });
    let outcome = RiskScorer::new(Arc::new(strategy), 0.0).score(&vector(&[(ZSCORE, 1.0)]));
    assert!(matches!(outcome.error, Some(ScoringError::InvalidOutput(_))));
}

#[test]
fn test_panicking_strategy_yields_fallback() {
    let strategy = ModelBasedScorer::new("boom", |_fv: &FeatureVector| -> Result<Prediction, ScoringError> {
        panic!("index out of bounds")
    });
    let outcome = RiskScorer::new(Arc::new(strategy), 0.0).score(&vector(&[(ZSCORE, 1.0)]));

    assert_eq!(outcome.score.status, ScoreStatus::Fallback);
    assert_eq!(
        outcome.error,
        Some(ScoringError::Panicked("index out of bounds".to_string()))
    );
}

#[test]
fn test_model_strategy_is_deterministic() {
    let strategy = ModelBasedScorer::new("half", |fv: &FeatureVector| {
        Ok(Prediction {
            score: fv.get(OPERATING_POSITION).unwrap_or(0.0) / 2.0,
            confidence: 0.9,
        })
    });
    let scorer = RiskScorer::new(Arc::new(strategy), 0.0);
    let fv = vector(&[(OPERATING_POSITION, 0.8)]);

    let a = scorer.score(&fv).score;
    let b = scorer.score(&fv).score;
    assert_eq!(a, b);
    assert_eq!(a.score, 0.4);
    assert_eq!(a.strategy, "half");
    assert_eq!(a.equipment_id, "kiln-3");
}

// ============================================================================
// LINEAR MODEL ARTIFACT
// ============================================================================

#[test]
fn test_linear_model_predicts_sigmoid() {
    let model = LinearModel::from_bytes(model_json(layout_hash()).as_bytes(), None).unwrap();

    // all scaled features 0 → sigmoid(-4)
    let low = model.predict(&vector(&[(ABS_ZSCORE, 0.0), (LIMIT_EXCESS, 0.0)])).unwrap();
    assert!(low.score < 0.02);
    assert_eq!(low.confidence, 0.8);

    // scaled features saturate at 1 → sigmoid(4)
    let high = model.predict(&vector(&[(ABS_ZSCORE, 10.0), (LIMIT_EXCESS, 2.0)])).unwrap();
    assert!(high.score > 0.98);

    let err = model.predict(&vector(&[(ABS_ZSCORE, 1.0)])).unwrap_err();
    assert_eq!(err, ScoringError::MissingFeature(LIMIT_EXCESS.to_string()));
}

#[test]
fn test_linear_model_rejects_foreign_layout() {
    let err = LinearModel::from_bytes(model_json(layout_hash() ^ 0xdead).as_bytes(), None).unwrap_err();
    assert!(matches!(err, ModelError::LayoutMismatch(_)));
}

#[test]
fn test_linear_model_checksum() {
    let json = model_json(layout_hash());
    let digest = sha256_hex(json.as_bytes());

    assert!(LinearModel::from_bytes(json.as_bytes(), Some(&digest.to_uppercase())).is_ok());
    let err = LinearModel::from_bytes(json.as_bytes(), Some("00ff")).unwrap_err();
    assert!(matches!(err, ModelError::ChecksumMismatch { .. }));
}

#[test]
fn test_linear_model_rejects_unknown_feature() {
    let model = LinearModel {
        name: "x".to_string(),
        version: String::new(),
        feature_version: FEATURE_VERSION,
        layout_hash: None,
        features: vec![ModelFeature {
            name: "cpu_percent".to_string(),
            weight: 1.0,
            min: 0.0,
            max: 1.0,
        }],
        intercept: 0.0,
        confidence: 1.0,
    };
    assert!(matches!(model.validate(), Err(ModelError::Invalid(_))));
}

#[test]
fn test_strategy_from_config_loads_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kiln.json");
    let json = model_json(layout_hash());
    std::fs::write(&path, &json).unwrap();

    let strategy = strategy_from_config(&ScoringConfig::Model {
        artifact_path: path.clone(),
        sha256: Some(sha256_hex(json.as_bytes())),
    })
    .unwrap();
    assert_eq!(strategy.name(), "model:kiln");

    let missing = strategy_from_config(&ScoringConfig::Model {
        artifact_path: dir.path().join("absent.json"),
        sha256: None,
    });
    assert!(matches!(missing, Err(ModelError::Io { .. })));

    let rule = strategy_from_config(&ScoringConfig::default()).unwrap();
    assert_eq!(rule.name(), rule::STRATEGY_NAME);
}
