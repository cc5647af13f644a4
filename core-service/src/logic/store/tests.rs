//! History store tests
//!
//! Both implementations run the same contract checks.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::*;
use crate::logic::model::scorer::time_to_failure_hours;
use crate::logic::model::ScoreStatus;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 6, 0, 0).unwrap()
}

fn reading(equipment: &str, metric: &str, secs: i64, value: f64) -> Reading {
    Reading {
        equipment_id: equipment.to_string(),
        timestamp: t0() + Duration::seconds(secs),
        metric_name: metric.to_string(),
        value,
    }
}

fn score(equipment: &str, secs: i64, value: f64) -> RiskScore {
    RiskScore {
        equipment_id: equipment.to_string(),
        metric_name: "vibration".to_string(),
        timestamp: t0() + Duration::seconds(secs),
        score: value,
        confidence: 1.0,
        status: ScoreStatus::Scored,
        strategy: "rule_based".to_string(),
        contributing_factors: vec![format!("{} outside operating range", equipment)],
        time_to_failure_hours: time_to_failure_hours(value),
    }
}

fn check_window_contract(store: &dyn HistoryStore) {
    for i in 0..10 {
        store.append(HistoryRecord::Reading(reading("m1", "vibration", i * 10, i as f64))).unwrap();
    }
    store.append(HistoryRecord::Reading(reading("m1", "humidity", 5, 50.0))).unwrap();
    store.append(HistoryRecord::Reading(reading("m2", "vibration", 5, 99.0))).unwrap();

    // last 3 up to t0+90s, ascending
    let window = WindowSpec::last(3, t0() + Duration::seconds(90));
    let got = store.query_window("m1", "vibration", &window).unwrap();
    let values: Vec<f64> = got.iter().map(|r| r.value).collect();
    assert_eq!(values, vec![7.0, 8.0, 9.0]);

    // upper bound excludes later readings
    let window = WindowSpec::last(3, t0() + Duration::seconds(45));
    let values: Vec<f64> = store
        .query_window("m1", "vibration", &window)
        .unwrap()
        .iter()
        .map(|r| r.value)
        .collect();
    assert_eq!(values, vec![2.0, 3.0, 4.0]);

    // span bound
    let window = WindowSpec::last(10, t0() + Duration::seconds(90)).with_span(Duration::seconds(20));
    let got = store.query_window("m1", "vibration", &window).unwrap();
    assert_eq!(got.len(), 3);
    assert!(got.iter().all(|r| window.admits(r.timestamp)));

    assert!(store.query_window("m3", "vibration", &window).unwrap().is_empty());

    let latest = store.latest_reading("m1", "vibration").unwrap().unwrap();
    assert_eq!(latest.value, 9.0);
    assert_eq!(latest.timestamp, t0() + Duration::seconds(90));
    assert!(store.latest_reading("m1", "tension").unwrap().is_none());
}

fn check_score_contract(store: &dyn HistoryStore) {
    for i in 0..5 {
        store.append(HistoryRecord::Score(score("m1", i, i as f64 / 10.0))).unwrap();
    }
    store.append(HistoryRecord::Score(score("m2", 0, 0.9))).unwrap();

    let recent = store.recent_scores("m1", 2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].score, 0.4);
    assert_eq!(recent[1].score, 0.3);
    assert_eq!(recent[0].status, ScoreStatus::Scored);
    // factors and failure horizon survive the round trip
    assert_eq!(recent[0], score("m1", 4, 0.4));
    assert_eq!(recent[0].time_to_failure_hours, Some(168));
    assert!(store.recent_scores("m9", 5).unwrap().is_empty());
}

#[test]
fn test_memory_store_contract() {
    let store = MemoryHistoryStore::new();
    check_window_contract(&store);
    check_score_contract(&store);
}

#[test]
fn test_sqlite_store_contract() {
    let store = SqliteHistoryStore::open_in_memory().unwrap();
    check_window_contract(&store);
    check_score_contract(&store);
}

#[test]
fn test_sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("history.db");

    {
        let store = SqliteHistoryStore::open(&path).unwrap();
        store.append(HistoryRecord::Reading(reading("m1", "tension", 0, 120.5))).unwrap();
        store.append(HistoryRecord::Score(score("m1", 0, 0.25))).unwrap();
    }

    let store = SqliteHistoryStore::open(&path).unwrap();
    assert_eq!(store.latest_reading("m1", "tension").unwrap().unwrap().value, 120.5);
    assert_eq!(store.recent_scores("m1", 10).unwrap()[0].score, 0.25);
}

#[test]
fn test_memory_retention_evicts_oldest() {
    let store = MemoryHistoryStore::with_retention(3);
    for i in 0..5 {
        store.append(HistoryRecord::Reading(reading("m1", "vibration", i, i as f64))).unwrap();
    }
    assert_eq!(store.reading_count(), 3);

    let window = WindowSpec::last(10, t0() + Duration::hours(1));
    let values: Vec<f64> = store
        .query_window("m1", "vibration", &window)
        .unwrap()
        .iter()
        .map(|r| r.value)
        .collect();
    assert_eq!(values, vec![2.0, 3.0, 4.0]);
}

#[test]
fn test_window_spec_admits() {
    let spec = WindowSpec::last(5, t0()).with_span(Duration::seconds(60));
    assert!(spec.admits(t0()));
    assert!(spec.admits(t0() - Duration::seconds(60)));
    assert!(!spec.admits(t0() - Duration::seconds(61)));
    assert!(!spec.admits(t0() + Duration::milliseconds(1)));

    // a span reaching past the earliest instant saturates
    let spec = WindowSpec::last(5, t0()).with_span(Duration::days(365 * 1_000_000));
    assert_eq!(spec.not_before, Some(DateTime::<Utc>::MIN_UTC));
    assert!(spec.admits(t0() - Duration::days(365 * 100)));
}

/// Store whose every call sleeps, for timeout tests
struct SlowStore(StdDuration);

impl HistoryStore for SlowStore {
    fn append(&self, _record: HistoryRecord) -> Result<(), StoreError> {
        std::thread::sleep(self.0);
        Ok(())
    }

    fn query_window(&self, _: &str, _: &str, _: &WindowSpec) -> Result<Vec<Reading>, StoreError> {
        std::thread::sleep(self.0);
        Ok(Vec::new())
    }

    fn latest_reading(&self, _: &str, _: &str) -> Result<Option<Reading>, StoreError> {
        std::thread::sleep(self.0);
        Ok(None)
    }

    fn recent_scores(&self, _: &str, _: usize) -> Result<Vec<RiskScore>, StoreError> {
        std::thread::sleep(self.0);
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_timed_store_times_out() {
    let store = TimedStore::new(Arc::new(SlowStore(StdDuration::from_millis(300))), StdDuration::from_millis(20));
    let err = store.latest_reading("m1", "vibration").await.unwrap_err();
    assert_eq!(err, StoreError::Timeout(StdDuration::from_millis(20)));
}

#[tokio::test]
async fn test_timed_store_passes_through() {
    let inner = Arc::new(MemoryHistoryStore::new());
    let store = TimedStore::new(inner.clone(), StdDuration::from_secs(1));

    store
        .append(HistoryRecord::Reading(reading("m1", "vibration", 0, 3.0)))
        .await
        .unwrap();
    let window = WindowSpec::last(5, t0() + Duration::seconds(1));
    let got = store.query_window("m1", "vibration", window).await.unwrap();

    assert_eq!(got.len(), 1);
    assert_eq!(inner.reading_count(), 1);
}
