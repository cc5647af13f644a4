//! Logic Module - Business Logic & Engines
//!
//! ## Layout
//! - `ingest/` - Raw reading validation, metric schema, synthetic telemetry
//! - `features/` - Versioned feature layout and rolling-window statistics
//! - `model/` - Scoring strategies (rule-based, model-based) and artifacts
//! - `alert/` - Per-equipment hysteresis state machine
//! - `store/` - History store trait, memory and SQLite backends
//! - `notify/` - Alert delivery (log, webhook) behind a non-blocking queue
//! - `pipeline/` - `Engine`: ingest -> features -> score -> alert

pub mod config;

pub mod ingest;
pub mod features;
pub mod model;
pub mod alert;
pub mod store;
pub mod notify;
pub mod pipeline;
