//! Ingest Module - Telemetry validation & normalization
//!
//! Turns an untrusted `RawReading` into a canonical `Reading`.
//!
//! - `reading.rs` - `RawReading` (wire shape) and `Reading` (canonical)
//! - `schema.rs` - Known metrics, aliases, valid/operating ranges
//! - `validate.rs` - Field, staleness and stream-order checks
//! - `synthetic.rs` - Sample telemetry generator for the replay tool

pub mod reading;
pub mod schema;
pub mod validate;
pub mod synthetic;


pub use reading::{RawReading, Reading};
pub use schema::{MetricSchema, MetricSpec, ValueRange};
pub use validate::{check_sequence, parse_timestamp, validate, ValidationError};
