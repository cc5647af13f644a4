//! Hysteresis state machine for one equipment
//!
//! Every metric stream of the equipment feeds the same tracker. The tracker
//! keeps the latest confident score of each stream and runs hysteresis on
//! the machine score, the highest of those. A healthy stream therefore
//! never resets the run of a failing one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{AlertEvent, AlertLevel, AlertPolicy, AlertState};
use crate::logic::model::RiskScore;

#[derive(Debug, Clone)]
pub struct HysteresisTracker {
    state: AlertState,
    /// Consecutive machine scores at/above the escalation threshold of the level
    escalate_run: usize,
    /// Consecutive machine scores below the de-escalation threshold of the level
    relax_run: usize,
}

impl HysteresisTracker {
    pub fn new(equipment_id: impl Into<String>, since: DateTime<Utc>) -> Self {
        Self {
            state: AlertState {
                equipment_id: equipment_id.into(),
                level: AlertLevel::Normal,
                since,
                last_score: None,
                metric_scores: BTreeMap::new(),
            },
            escalate_run: 0,
            relax_run: 0,
        }
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    /// Highest latest score across streams, with the stream it came from
    fn machine_score(&self) -> Option<(&str, f64)> {
        self.state
            .metric_scores
            .iter()
            .map(|(metric, score)| (metric.as_str(), *score))
            .fold(None, |best, (metric, score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((metric, score)),
            })
    }

    /// Feed one score; returns the transition it caused, if any
    pub fn observe(&mut self, score: &RiskScore, policy: &AlertPolicy) -> Option<AlertEvent> {
        if score.confidence <= 0.0 {
            return None;
        }

        self.state.metric_scores.insert(score.metric_name.clone(), score.score);
        let (metric, machine) = self.machine_score()?;
        let metric = metric.to_string();

        let level = self.state.level;
        self.state.last_score = Some(machine);

        match policy.escalation_threshold(level) {
            Some(t) if machine >= t => self.escalate_run += 1,
            _ => self.escalate_run = 0,
        }
        match policy.relax_threshold(level) {
            Some(t) if machine < t => self.relax_run += 1,
            _ => self.relax_run = 0,
        }

        let k = policy.consecutive_count.max(1);
        let next = if self.escalate_run >= k {
            level.escalated()
        } else if self.relax_run >= k {
            level.relaxed()
        } else {
            None
        }?;

        self.state.level = next;
        self.state.since = score.timestamp;
        self.escalate_run = 0;
        self.relax_run = 0;

        Some(AlertEvent {
            id: Uuid::new_v4(),
            equipment_id: self.state.equipment_id.clone(),
            old_level: level,
            new_level: next,
            triggering_score: machine,
            triggering_metric: metric,
            timestamp: score.timestamp,
        })
    }
}
