//! History Store - Append-only readings and scores
//!
//! The engine only sees the `HistoryStore` trait. Implementations are
//! synchronous; the engine wraps them in a `TimedStore` that runs every call
//! on the blocking pool under `store_timeout`.
//!
//! - `memory.rs` - `MemoryHistoryStore` (bounded, per stream)
//! - `sqlite.rs` - `SqliteHistoryStore` (rusqlite, file or in-memory)
//! - `timed.rs` - `TimedStore` async wrapper

pub mod memory;
pub mod sqlite;
pub mod timed;

#[cfg(test)]
mod tests;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::ingest::Reading;
use crate::logic::model::RiskScore;

pub use memory::MemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;
pub use timed::TimedStore;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum HistoryRecord {
    Reading(Reading),
    Score(RiskScore),
}

/// Bound of a feature window: at most `max_count` readings with
/// `not_before <= timestamp <= until`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSpec {
    pub max_count: usize,
    pub not_before: Option<DateTime<Utc>>,
    pub until: DateTime<Utc>,
}

impl WindowSpec {
    pub fn last(max_count: usize, until: DateTime<Utc>) -> Self {
        Self {
            max_count,
            not_before: None,
            until,
        }
    }

    pub fn with_span(mut self, span: chrono::Duration) -> Self {
        self.not_before = Some(self.until.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC));
        self
    }

    pub fn admits(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp <= self.until && self.not_before.map_or(true, |nb| timestamp >= nb)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("history store did not answer within {0:?}")]
    Timeout(Duration),

    #[error("history store backend error: {0}")]
    Backend(String),

    #[error("history store worker failed: {0}")]
    Worker(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

// ============================================================================
// TRAIT
// ============================================================================

pub trait HistoryStore: Send + Sync {
    fn append(&self, record: HistoryRecord) -> Result<(), StoreError>;

    /// Readings of one stream inside `window`, oldest first
    fn query_window(
        &self,
        equipment_id: &str,
        metric_name: &str,
        window: &WindowSpec,
    ) -> Result<Vec<Reading>, StoreError>;

    fn latest_reading(&self, equipment_id: &str, metric_name: &str) -> Result<Option<Reading>, StoreError>;

    /// Most recent scores of one equipment, newest first
    fn recent_scores(&self, equipment_id: &str, limit: usize) -> Result<Vec<RiskScore>, StoreError>;
}
