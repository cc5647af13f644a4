//! MaintAI Core - Predictive Failure Scoring Engine
//!
//! Turns raw equipment telemetry into a failure-risk signal and drives
//! alerting:
//!
//! ```text
//! RawReading ─► ingest ─► features ─► model (risk score) ─► alert ─► notify
//!                  │          ▲                 │
//!                  ▼          │                 ▼
//!               ┌──────── history store ────────┐
//! ```
//!
//! The single entry point is [`Engine::submit_reading`].

pub mod constants;
pub mod logic;

pub use logic::alert::{AlertEvent, AlertLevel, AlertPolicy, AlertState, AlertStats};
pub use logic::config::{ConfigError, EngineConfig, ScoringConfig};
pub use logic::features::FeatureVector;
pub use logic::ingest::{RawReading, Reading, ValidationError};
pub use logic::model::{RiskScore, ScoreStatus, ScoringError, ScoringStrategy};
pub use logic::notify::{Notifier, NotifyError};
pub use logic::pipeline::{
    Engine, EngineBuilder, EngineError, ErrorKind, PipelineError, Stage, SubmitOutcome,
};
pub use logic::store::{HistoryRecord, HistoryStore, StoreError, WindowSpec};
