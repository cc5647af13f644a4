//! Alert types

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ALERT LEVEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Normal => "NORMAL",
            AlertLevel::Warning => "WARNING",
            AlertLevel::Critical => "CRITICAL",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            AlertLevel::Normal => "🟢",
            AlertLevel::Warning => "🟠",
            AlertLevel::Critical => "🔴",
        }
    }

    /// Discord embed color
    pub fn color(&self) -> u32 {
        match self {
            AlertLevel::Normal => 0x2ECC71,
            AlertLevel::Warning => 0xF39C12,
            AlertLevel::Critical => 0xE74C3C,
        }
    }

    /// One level up; `None` at CRITICAL
    pub fn escalated(&self) -> Option<AlertLevel> {
        match self {
            AlertLevel::Normal => Some(AlertLevel::Warning),
            AlertLevel::Warning => Some(AlertLevel::Critical),
            AlertLevel::Critical => None,
        }
    }

    /// One level down; `None` at NORMAL
    pub fn relaxed(&self) -> Option<AlertLevel> {
        match self {
            AlertLevel::Normal => None,
            AlertLevel::Warning => Some(AlertLevel::Normal),
            AlertLevel::Critical => Some(AlertLevel::Warning),
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(AlertLevel::Normal),
            "WARNING" => Ok(AlertLevel::Warning),
            "CRITICAL" => Ok(AlertLevel::Critical),
            other => Err(format!("unknown alert level '{}'", other)),
        }
    }
}

// ============================================================================
// STATE & EVENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    pub equipment_id: String,
    pub level: AlertLevel,
    /// Timestamp of the score that caused the last transition (or first seen)
    pub since: DateTime<Utc>,
    /// Machine score of the last confident update
    pub last_score: Option<f64>,
    /// Latest confident score per metric stream
    #[serde(default)]
    pub metric_scores: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: Uuid,
    pub equipment_id: String,
    pub old_level: AlertLevel,
    pub new_level: AlertLevel,
    pub triggering_score: f64,
    /// Stream holding the machine score at the transition
    pub triggering_metric: String,
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    pub fn is_escalation(&self) -> bool {
        self.new_level > self.old_level
    }

    pub fn summary(&self) -> String {
        format!(
            "{} {} → {} (risk {:.2} from {})",
            self.equipment_id, self.old_level, self.new_level, self.triggering_score, self.triggering_metric
        )
    }
}

/// Equipment count per alert level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertStats {
    pub total: usize,
    pub normal: usize,
    pub warning: usize,
    pub critical: usize,
}

impl AlertStats {
    pub fn record(&mut self, level: AlertLevel) {
        self.total += 1;
        match level {
            AlertLevel::Normal => self.normal += 1,
            AlertLevel::Warning => self.warning += 1,
            AlertLevel::Critical => self.critical += 1,
        }
    }
}

// ============================================================================
// POLICY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertPolicy {
    pub warn_threshold: f64,
    pub crit_threshold: f64,
    pub hysteresis_margin: f64,
    /// k: consecutive scores needed for any transition
    pub consecutive_count: usize,
}

impl AlertPolicy {
    /// Score at or above which `level` counts toward escalation
    pub fn escalation_threshold(&self, level: AlertLevel) -> Option<f64> {
        match level {
            AlertLevel::Normal => Some(self.warn_threshold),
            AlertLevel::Warning => Some(self.crit_threshold),
            AlertLevel::Critical => None,
        }
    }

    /// Score below which `level` counts toward de-escalation
    pub fn relax_threshold(&self, level: AlertLevel) -> Option<f64> {
        match level {
            AlertLevel::Normal => None,
            AlertLevel::Warning => Some(self.warn_threshold - self.hysteresis_margin),
            AlertLevel::Critical => Some(self.crit_threshold - self.hysteresis_margin),
        }
    }
}
