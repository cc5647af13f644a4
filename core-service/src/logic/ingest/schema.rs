//! Metric Schema
//!
//! Known metric names, their aliases and value ranges.
//!
//! - `valid_range`: physically possible values; anything outside is a sensor
//!   fault and the reading is rejected.
//! - `operating_range`: normal operating envelope; drives the
//!   `operating_position` and `limit_excess` features.

use serde::{Deserialize, Serialize};

/// Aliases shorter than this only match exactly (e.g. "rh")
const MIN_SUBSTRING_ALIAS_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Canonical name stored with every reading
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub valid_range: Option<ValueRange>,
    pub operating_range: ValueRange,
}

impl MetricSpec {
    fn matches_exactly(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    fn matches_loosely(&self, name: &str) -> bool {
        name.contains(self.name.as_str())
            || self
                .aliases
                .iter()
                .filter(|a| a.len() >= MIN_SUBSTRING_ALIAS_LEN)
                .any(|a| name.contains(a.as_str()))
    }
}

/// Registry of known metrics, in match priority order
#[derive(Debug, Clone)]
pub struct MetricSchema {
    specs: Vec<MetricSpec>,
}

impl MetricSchema {
    /// Aliases are matched case-insensitively; they are trimmed and
    /// lowercased here
    pub fn new(mut specs: Vec<MetricSpec>) -> Result<Self, String> {
        if specs.is_empty() {
            return Err("metric schema is empty".to_string());
        }

        for spec in &mut specs {
            spec.aliases = spec
                .aliases
                .iter()
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect();
        }

        for (i, spec) in specs.iter().enumerate() {
            if spec.name.trim().is_empty() || spec.name != spec.name.to_lowercase() {
                return Err(format!("metric name '{}' must be non-empty lowercase", spec.name));
            }
            if specs[..i].iter().any(|other| other.name == spec.name) {
                return Err(format!("metric '{}' declared twice", spec.name));
            }
            if !(spec.operating_range.width() > 0.0) {
                return Err(format!("metric '{}' has an empty operating range", spec.name));
            }
            if let Some(valid) = spec.valid_range {
                if !(valid.width() > 0.0) {
                    return Err(format!("metric '{}' has an empty valid range", spec.name));
                }
            }
        }

        Ok(Self { specs })
    }

    /// Default industrial sensor set
    pub fn default_specs() -> Vec<MetricSpec> {
        let spec = |name: &str, unit: &str, aliases: &[&str], valid: ValueRange, operating: ValueRange| {
            MetricSpec {
                name: name.to_string(),
                unit: unit.to_string(),
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
                valid_range: Some(valid),
                operating_range: operating,
            }
        };

        vec![
            spec(
                "temperature",
                "°C",
                &["temp", "thermal"],
                ValueRange::new(-50.0, 150.0),
                ValueRange::new(-10.0, 80.0),
            ),
            spec(
                "humidity",
                "%",
                &["moisture", "rh"],
                ValueRange::new(0.0, 100.0),
                ValueRange::new(0.0, 100.0),
            ),
            spec(
                "tension",
                "N",
                &["pressure", "force", "stress"],
                ValueRange::new(0.0, 1000.0),
                ValueRange::new(0.0, 1000.0),
            ),
            spec(
                "vibration",
                "g",
                &["vibr", "oscillation", "shake"],
                ValueRange::new(0.0, 100.0),
                ValueRange::new(0.0, 50.0),
            ),
        ]
    }

    /// Resolve a raw metric name to its spec
    ///
    /// Exact name/alias matches win; otherwise the first spec whose name or
    /// alias occurs inside the raw name ("Motor Temp 1" -> temperature).
    pub fn resolve(&self, raw_name: &str) -> Option<&MetricSpec> {
        let name = raw_name.trim().to_lowercase();
        if name.is_empty() {
            return None;
        }

        self.specs
            .iter()
            .find(|s| s.matches_exactly(&name))
            .or_else(|| self.specs.iter().find(|s| s.matches_loosely(&name)))
    }

    /// Lookup by canonical name
    pub fn get(&self, name: &str) -> Option<&MetricSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn specs(&self) -> &[MetricSpec] {
        &self.specs
    }
}

impl Default for MetricSchema {
    fn default() -> Self {
        Self { specs: Self::default_specs() }
    }
}
