//! Synthetic Telemetry
//!
//! Generates a plausible four-sensor series for demos and replay:
//! daily/weekly temperature cycles, humidity inversely correlated with
//! temperature, noisy tension, vibration with occasional spikes.
//! With `degrade_after` set, temperature and vibration ramp up from that
//! sample on, which is what a failing bearing looks like on the dashboard.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::reading::RawReading;

/// Samples per simulated day at one-minute spacing
const SAMPLES_PER_DAY: f64 = 24.0 * 60.0;

#[derive(Debug, Clone)]
pub struct SyntheticSeries {
    pub equipment_id: String,
    pub samples: usize,
    pub interval: Duration,
    pub seed: u64,
    pub degrade_after: Option<usize>,
}

impl SyntheticSeries {
    pub fn new(equipment_id: impl Into<String>, samples: usize) -> Self {
        Self {
            equipment_id: equipment_id.into(),
            samples,
            interval: Duration::minutes(1),
            seed: 42,
            degrade_after: None,
        }
    }

    /// Readings for all four metrics, oldest first, ending at `end`
    pub fn generate(&self, end: DateTime<Utc>) -> Vec<RawReading> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut out = Vec::with_capacity(self.samples * 4);
        let start = end - self.interval * (self.samples.saturating_sub(1) as i32);

        for i in 0..self.samples {
            let ts = start + self.interval * (i as i32);
            let phase = i as f64;
            let day = (2.0 * std::f64::consts::PI * phase / SAMPLES_PER_DAY).sin();
            let week = (2.0 * std::f64::consts::PI * phase / (SAMPLES_PER_DAY * 7.0)).sin();

            let wear = match self.degrade_after {
                Some(onset) if i >= onset => (i - onset) as f64,
                _ => 0.0,
            };

            let temperature = 25.0 + 3.0 * day + 2.0 * week + rng.gen_range(-1.0..1.0) + 0.4 * wear;
            let humidity = 55.0 - 0.5 * (temperature - 25.0) + rng.gen_range(-3.0..3.0);
            let tension: f64 = 150.0 + rng.gen_range(-20.0..20.0);
            let mut vibration = 10.0 + rng.gen_range(-2.0..2.0) + 0.3 * wear;
            if rng.gen_bool(0.05) {
                vibration += rng.gen_range(10.0..20.0);
            }

            for (metric, value) in [
                ("temperature", temperature.clamp(-50.0, 150.0)),
                ("humidity", humidity.clamp(0.0, 100.0)),
                ("tension", tension.max(0.0)),
                ("vibration", vibration.clamp(0.0, 100.0)),
            ] {
                out.push(RawReading::new(self.equipment_id.clone(), ts, metric, value));
            }
        }

        out
    }
}
