//! Alert Evaluator
//!
//! Owns every `AlertState`. One tracker per equipment, created on its first
//! score and shared by all of its metric streams; each tracker has its own
//! lock so equipment never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::hysteresis::HysteresisTracker;
use super::types::{AlertEvent, AlertLevel, AlertPolicy, AlertState, AlertStats};
use crate::logic::model::RiskScore;

pub struct AlertEvaluator {
    policy: AlertPolicy,
    trackers: RwLock<HashMap<String, Arc<Mutex<HysteresisTracker>>>>,
}

impl AlertEvaluator {
    pub fn new(policy: AlertPolicy) -> Self {
        Self {
            policy,
            trackers: RwLock::new(HashMap::new()),
        }
    }

    fn tracker(&self, score: &RiskScore) -> Arc<Mutex<HysteresisTracker>> {
        if let Some(tracker) = self.trackers.read().get(&score.equipment_id) {
            return Arc::clone(tracker);
        }

        let mut trackers = self.trackers.write();
        Arc::clone(trackers.entry(score.equipment_id.clone()).or_insert_with(|| {
            log::debug!("Tracking alert state for {}", score.equipment_id);
            Arc::new(Mutex::new(HysteresisTracker::new(&score.equipment_id, score.timestamp)))
        }))
    }

    /// Apply one score to its equipment's state machine
    pub fn evaluate(&self, score: &RiskScore) -> Option<AlertEvent> {
        let tracker = self.tracker(score);
        let event = tracker.lock().observe(score, &self.policy)?;

        if event.is_escalation() {
            log::warn!("Alert: {}", event.summary());
        } else {
            log::info!("Alert cleared: {}", event.summary());
        }
        Some(event)
    }

    pub fn state(&self, equipment_id: &str) -> Option<AlertState> {
        let tracker = self.trackers.read().get(equipment_id).cloned()?;
        let state = tracker.lock().state().clone();
        Some(state)
    }

    /// Every known state, ordered by equipment id
    pub fn states(&self) -> Vec<AlertState> {
        let trackers: Vec<_> = self.trackers.read().values().cloned().collect();
        let mut states: Vec<AlertState> = trackers.iter().map(|t| t.lock().state().clone()).collect();
        states.sort_by(|a, b| a.equipment_id.cmp(&b.equipment_id));
        states
    }

    pub fn states_at_level(&self, level: AlertLevel) -> Vec<AlertState> {
        self.states().into_iter().filter(|s| s.level == level).collect()
    }

    pub fn stats(&self) -> AlertStats {
        let trackers: Vec<_> = self.trackers.read().values().cloned().collect();
        let mut stats = AlertStats::default();
        for tracker in &trackers {
            stats.record(tracker.lock().state().level);
        }
        stats
    }
}
