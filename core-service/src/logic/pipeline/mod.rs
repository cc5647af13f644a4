//! Pipeline Module - `Engine` and its submit outcome
//!
//! - `engine.rs` - `Engine`, `EngineBuilder`, the submit pipeline
//! - `outcome.rs` - `SubmitOutcome`, `PipelineError`, `ErrorKind`
//! - `keyed.rs` - per-equipment locks and stream cursors
//! - `clock.rs` - injectable wall clock

pub mod clock;
pub mod engine;
pub mod keyed;
pub mod outcome;


pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Engine, EngineBuilder, EngineError};
pub use outcome::{ErrorKind, PipelineError, Stage, SubmitOutcome};
