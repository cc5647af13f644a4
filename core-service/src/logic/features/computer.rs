//! Feature Computer
//!
//! Derives the rolling features of one stream from its recent history plus
//! the triggering reading. History comes from the store through
//! `window_for`; `compute` itself is pure.

use std::sync::Arc;

use super::layout::{
    ABS_ZSCORE, LIMIT_EXCESS, MOVING_AVERAGE, MOVING_VARIANCE, NORMALIZED_SLOPE,
    OPERATING_POSITION, RATE_OF_CHANGE, SLOPE, ZSCORE,
};
use super::vector::FeatureVector;
use super::window;
use crate::logic::config::EngineConfig;
use crate::logic::ingest::{MetricSchema, Reading, ValueRange};
use crate::logic::store::WindowSpec;

pub struct FeatureComputer {
    config: Arc<EngineConfig>,
    schema: Arc<MetricSchema>,
}

impl FeatureComputer {
    pub fn new(config: Arc<EngineConfig>, schema: Arc<MetricSchema>) -> Self {
        Self { config, schema }
    }

    /// Window to fetch for `reading`: last `window_size` readings up to and
    /// including it, optionally no older than `window_span`
    pub fn window_for(&self, reading: &Reading) -> WindowSpec {
        let spec = WindowSpec::last(self.config.window_size, reading.timestamp);
        match self.config.window_span() {
            Some(span) => spec.with_span(span),
            None => spec,
        }
    }

    /// Compute the feature vector for `reading`
    ///
    /// `history` is the stream's window in ascending order. Readings from
    /// other streams or outside the window bound are ignored; the triggering
    /// reading is appended when the store has not returned it.
    pub fn compute(&self, reading: &Reading, history: &[Reading]) -> FeatureVector {
        let spec = self.window_for(reading);

        let mut samples: Vec<&Reading> = history
            .iter()
            .filter(|r| r.equipment_id == reading.equipment_id && r.metric_name == reading.metric_name)
            .filter(|r| spec.admits(r.timestamp))
            .collect();

        if !samples.last().is_some_and(|last| last.is_duplicate_of(reading)) {
            samples.push(reading);
        }
        let excess = samples.len().saturating_sub(spec.max_count);
        samples.drain(..excess);

        let builder = FeatureVector::builder(&reading.equipment_id, &reading.metric_name, reading.timestamp)
            .sample_count(samples.len())
            .last_value(reading.value);

        if samples.len() < self.config.window_size {
            log::debug!(
                "{}/{}: {} of {} readings, insufficient history",
                reading.equipment_id,
                reading.metric_name,
                samples.len(),
                self.config.window_size
            );
            return builder.insufficient_history(true).build();
        }

        let values: Vec<f64> = samples.iter().map(|r| r.value).collect();
        let slope = window::slope(&values);
        let zscore = window::trailing_zscore(&values);

        let rate_of_change = match samples.as_slice() {
            [.., prev, last] => {
                let dt = (last.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
                if dt > 0.0 {
                    (last.value - prev.value) / dt
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };

        let mut builder = builder
            .set(MOVING_AVERAGE, window::mean(&values).unwrap_or(reading.value))
            .set(MOVING_VARIANCE, window::sample_variance(&values))
            .set(SLOPE, slope)
            .set(RATE_OF_CHANGE, rate_of_change)
            .set(ZSCORE, zscore)
            .set(ABS_ZSCORE, zscore.abs());

        if let Some(metric) = self.schema.get(&reading.metric_name) {
            let range = metric.operating_range;
            builder = builder
                .set(NORMALIZED_SLOPE, slope * values.len() as f64 / range.width())
                .set(OPERATING_POSITION, operating_position(range, reading.value))
                .set(LIMIT_EXCESS, limit_excess(range, reading.value));
        }

        builder.build()
    }
}

fn operating_position(range: ValueRange, value: f64) -> f64 {
    (value - range.min) / range.width()
}

fn limit_excess(range: ValueRange, value: f64) -> f64 {
    if value > range.max {
        (value - range.max) / range.width()
    } else if value < range.min {
        (range.min - value) / range.width()
    } else {
        0.0
    }
}
