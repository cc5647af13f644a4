//! Configuration module

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use maintai_core::{ConfigError, EngineConfig};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// SQLite history database; in-memory history when unset
    pub history_db_path: Option<PathBuf>,

    /// Engine config JSON file; engine defaults when unset
    pub engine_config_path: Option<PathBuf>,

    /// Alert webhook
    pub webhook_url: Option<String>,
    pub webhook_platform: String,

    /// Environment (development, production)
    pub environment: String,

    /// Overrides applied on top of the engine config file
    pub warn_threshold: Option<f64>,
    pub crit_threshold: Option<f64>,
    pub hysteresis_margin: Option<f64>,
    pub consecutive_count: Option<usize>,
    pub window_size: Option<usize>,
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: parsed("PORT").unwrap_or(8080),

            history_db_path: non_empty("HISTORY_DB_PATH").map(PathBuf::from),
            engine_config_path: non_empty("ENGINE_CONFIG").map(PathBuf::from),

            webhook_url: non_empty("WEBHOOK_URL"),
            webhook_platform: env::var("WEBHOOK_PLATFORM").unwrap_or_else(|_| "generic".to_string()),

            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            warn_threshold: parsed("WARN_THRESHOLD"),
            crit_threshold: parsed("CRIT_THRESHOLD"),
            hysteresis_margin: parsed("HYSTERESIS_MARGIN"),
            consecutive_count: parsed("CONSECUTIVE_COUNT"),
            window_size: parsed("WINDOW_SIZE"),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Engine config from `ENGINE_CONFIG` (or defaults) with env overrides
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let mut engine = match &self.engine_config_path {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };

        if let Some(v) = self.warn_threshold {
            engine.warn_threshold = v;
        }
        if let Some(v) = self.crit_threshold {
            engine.crit_threshold = v;
        }
        if let Some(v) = self.hysteresis_margin {
            engine.hysteresis_margin = v;
        }
        if let Some(v) = self.consecutive_count {
            engine.consecutive_count = v;
        }
        if let Some(v) = self.window_size {
            engine.window_size = v;
        }

        engine.validate()?;
        Ok(engine)
    }
}

#[cfg(test)]
impl Default for Config {
    fn default() -> Self {
        Self {
            port: 0,
            history_db_path: None,
            engine_config_path: None,
            webhook_url: None,
            webhook_platform: "generic".to_string(),
            environment: "test".to_string(),
            warn_threshold: None,
            crit_threshold: None,
            hysteresis_margin: None,
            consecutive_count: None,
            window_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let config = Config {
            warn_threshold: Some(0.6),
            consecutive_count: Some(5),
            ..Default::default()
        };
        let engine = config.engine_config().unwrap();
        assert_eq!(engine.warn_threshold, 0.6);
        assert_eq!(engine.consecutive_count, 5);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let config = Config {
            warn_threshold: Some(0.95),
            crit_threshold: Some(0.9),
            ..Default::default()
        };
        assert!(config.engine_config().is_err());
    }
}
