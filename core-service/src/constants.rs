//! Central Configuration Constants
//!
//! Single source of truth for all engine defaults.
//! `EngineConfig::default()` reads from here; change a default only here.

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "MaintAI";

// ============================================
// Alert policy
// ============================================

/// Score at or above which equipment starts counting towards WARNING
pub const DEFAULT_WARN_THRESHOLD: f64 = 0.7;

/// Score at or above which equipment starts counting towards CRITICAL
pub const DEFAULT_CRIT_THRESHOLD: f64 = 0.9;

/// Distance below a threshold required before de-escalation counts
pub const DEFAULT_HYSTERESIS_MARGIN: f64 = 0.05;

/// Consecutive scores required for any level change (k)
pub const DEFAULT_CONSECUTIVE_COUNT: usize = 3;

// ============================================
// Feature window
// ============================================

/// Readings per feature window (rolling window of 10, as the dashboard charts)
pub const DEFAULT_WINDOW_SIZE: usize = 10;

// ============================================
// Ingest
// ============================================

/// Readings older than this are rejected (24 hours)
pub const DEFAULT_STALENESS_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Upper bound for any configured duration (10 years)
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Readings further ahead of server time than this are rejected
pub const DEFAULT_MAX_FUTURE_SKEW_SECS: u64 = 5 * 60;

/// Longest accepted equipment identifier
pub const MAX_EQUIPMENT_ID_LEN: usize = 128;

// ============================================
// Collaborators
// ============================================

/// Upper bound for a single history store call (milliseconds)
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 2_000;

/// Pending alert events before new ones are dropped
pub const DEFAULT_NOTIFY_QUEUE_CAPACITY: usize = 256;

/// Readings kept per stream by the in-memory history store
pub const DEFAULT_MEMORY_RETENTION: usize = 10_000;

/// Webhook request timeout (seconds)
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;

/// Score emitted when the scoring strategy fails
pub const DEFAULT_FALLBACK_SCORE: f64 = 0.0;

/// History database file name under the app data directory
pub const HISTORY_DB_FILE: &str = "history.db";
