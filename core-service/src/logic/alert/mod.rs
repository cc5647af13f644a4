//! Alert Module - Per-equipment alert levels with hysteresis
//!
//! NORMAL ⇄ WARNING ⇄ CRITICAL, one level per transition, each transition
//! requiring k consecutive qualifying scores.

pub mod types;
pub mod hysteresis;
pub mod evaluator;


pub use evaluator::AlertEvaluator;
pub use hysteresis::HysteresisTracker;
pub use types::{AlertEvent, AlertLevel, AlertPolicy, AlertState, AlertStats};
