//! Controller settings

use anyhow::Result;
use ratekeeper_common::{ConfigError, MAX_RATES_CAPACITY};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default minimum period between two updates of a token (1 hour)
pub const DEFAULT_PERIOD_SECS: u64 = 3_600;

/// Default number of observations allocated on a token's first config
pub const DEFAULT_INITIAL_CAPACITY: usize = 24;

/// Default number of events kept in memory
pub const DEFAULT_EVENT_HISTORY: usize = 256;

/// Rate controller settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// Minimum seconds between two accepted updates of a token
    pub period_secs: u64,
    /// Buffer capacity allocated when a token is first configured
    pub initial_capacity: usize,
    /// Events kept by the in-memory sink
    pub event_history: usize,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            period_secs: DEFAULT_PERIOD_SECS,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            event_history: DEFAULT_EVENT_HISTORY,
            log_filter: "info".to_string(),
        }
    }
}

impl ControllerSettings {
    /// Load settings from the environment (and `.env` if present)
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();

        if let Some(v) = parse_var("RATEKEEPER_PERIOD_SECS") {
            cfg.period_secs = v;
        }
        if let Some(v) = parse_var("RATEKEEPER_INITIAL_CAPACITY") {
            cfg.initial_capacity = v;
        }
        if let Some(v) = parse_var("RATEKEEPER_EVENT_HISTORY") {
            cfg.event_history = v;
        }
        if let Ok(filter) = std::env::var("RATEKEEPER_LOG") {
            cfg.log_filter = filter;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_period_secs(mut self, period_secs: u64) -> Self {
        self.period_secs = period_secs;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_event_history(mut self, history: usize) -> Self {
        self.event_history = history;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.initial_capacity == 0 || self.initial_capacity > MAX_RATES_CAPACITY {
            return Err(ConfigError::Settings(format!(
                "initial_capacity must be within 1..={}, got {}",
                MAX_RATES_CAPACITY, self.initial_capacity
            )));
        }
        Ok(())
    }
}

/// Parse an environment variable, ignoring (with a warning) values that do not parse
pub fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    parse_setting(name, &raw)
}

/// Parse the raw value of setting `name`; warns and yields `None` on failure
pub fn parse_setting<T: std::str::FromStr>(name: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "Ignoring unparseable setting");
            None
        }
    }
}
