//! Feature Computer tests

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::computer::FeatureComputer;
use super::layout::*;
use crate::logic::config::EngineConfig;
use crate::logic::ingest::{MetricSchema, Reading};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
}

fn reading(metric: &str, minute: i64, value: f64) -> Reading {
    Reading {
        equipment_id: "press-01".to_string(),
        timestamp: t0() + Duration::minutes(minute),
        metric_name: metric.to_string(),
        value,
    }
}

fn computer(window_size: usize, span_secs: Option<u64>) -> FeatureComputer {
    let config = EngineConfig {
        window_size,
        window_span_secs: span_secs,
        ..Default::default()
    };
    FeatureComputer::new(Arc::new(config), Arc::new(MetricSchema::default()))
}

#[test]
fn test_insufficient_history_does_not_fabricate() {
    let fc = computer(5, None);
    let history: Vec<Reading> = (0..3).map(|i| reading("temperature", i, 20.0)).collect();
    let fv = fc.compute(&reading("temperature", 3, 21.0), &history);

    assert!(fv.is_insufficient());
    assert_eq!(fv.sample_count(), 4);
    assert_eq!(fv.get(LAST_VALUE), Some(21.0));
    assert_eq!(fv.get(MOVING_AVERAGE), None);
    assert_eq!(fv.get(ZSCORE), None);
}

#[test]
fn test_full_window_features() {
    let fc = computer(4, None);
    let history: Vec<Reading> = [20.0, 22.0, 24.0, 26.0]
        .iter()
        .enumerate()
        .map(|(i, v)| reading("temperature", i as i64, *v))
        .collect();
    // store already returned the triggering reading
    let fv = fc.compute(&history[3], &history);

    assert!(!fv.is_insufficient());
    assert_eq!(fv.sample_count(), 4);
    assert_eq!(fv.get(MOVING_AVERAGE), Some(23.0));
    assert!((fv.get(SLOPE).unwrap() - 2.0).abs() < 1e-9);
    // 2 per minute
    assert!((fv.get(RATE_OF_CHANGE).unwrap() - 2.0 / 60.0).abs() < 1e-9);
    // operating range -10..80 → width 90
    assert!((fv.get(OPERATING_POSITION).unwrap() - 36.0 / 90.0).abs() < 1e-9);
    assert!((fv.get(NORMALIZED_SLOPE).unwrap() - 8.0 / 90.0).abs() < 1e-9);
    assert_eq!(fv.get(LIMIT_EXCESS), Some(0.0));
    assert!(fv.validate().is_ok());
}

#[test]
fn test_window_capped_at_window_size() {
    let fc = computer(3, None);
    let history: Vec<Reading> = (0..10).map(|i| reading("vibration", i, i as f64)).collect();
    let fv = fc.compute(&reading("vibration", 10, 10.0), &history);

    assert_eq!(fv.sample_count(), 3);
    assert_eq!(fv.get(MOVING_AVERAGE), Some(9.0));
}

#[test]
fn test_window_span_excludes_old_readings() {
    let fc = computer(3, Some(120));
    let history = vec![
        reading("vibration", 0, 5.0),
        reading("vibration", 1, 5.0),
        reading("vibration", 8, 5.0),
        reading("vibration", 9, 6.0),
    ];
    let fv = fc.compute(&reading("vibration", 10, 7.0), &history);

    // only minutes 8, 9 and 10 are within 120s
    assert_eq!(fv.sample_count(), 3);
    assert!(!fv.is_insufficient());

    let fv = fc.compute(&reading("vibration", 30, 7.0), &history);
    assert_eq!(fv.sample_count(), 1);
    assert!(fv.is_insufficient());
}

#[test]
fn test_other_streams_ignored() {
    let fc = computer(2, None);
    let history = vec![reading("humidity", 0, 50.0), reading("temperature", 1, 20.0)];
    let fv = fc.compute(&reading("temperature", 2, 21.0), &history);

    assert_eq!(fv.sample_count(), 2);
    assert_eq!(fv.get(MOVING_AVERAGE), Some(20.5));
}

#[test]
fn test_limit_excess_outside_envelope() {
    let fc = computer(2, None);
    // vibration operating range 0..50
    let history = vec![reading("vibration", 0, 40.0)];
    let fv = fc.compute(&reading("vibration", 1, 60.0), &history);

    assert!((fv.get(LIMIT_EXCESS).unwrap() - 0.2).abs() < 1e-9);
    assert!((fv.get(OPERATING_POSITION).unwrap() - 1.2).abs() < 1e-9);
}

#[test]
fn test_zscore_spike() {
    let fc = computer(6, None);
    let history: Vec<Reading> = [10.0, 11.0, 9.0, 10.0, 11.0]
        .iter()
        .enumerate()
        .map(|(i, v)| reading("vibration", i as i64, *v))
        .collect();
    let fv = fc.compute(&reading("vibration", 5, 30.0), &history);

    assert!(fv.get(ZSCORE).unwrap() > 3.0);
    assert_eq!(fv.get(ABS_ZSCORE), fv.get(ZSCORE));
}

#[test]
fn test_log_entry_contains_layout() {
    let fc = computer(1, None);
    let fv = fc.compute(&reading("tension", 0, 100.0), &[]);
    let entry = fv.to_log_entry();

    assert_eq!(entry["feature_version"], FEATURE_VERSION);
    assert_eq!(entry["features"]["last_value"], 100.0);
    assert_eq!(fv.to_dense().len(), FEATURE_COUNT);
}
