//! Keeper configuration

use std::path::PathBuf;

use anyhow::Result;
use ratekeeper_controller::settings::parse_var;
use ratekeeper_controller::ControllerSettings;
use serde::{Deserialize, Serialize};

/// Keeper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Controller settings (period, capacity, event history, log filter)
    pub controller: ControllerSettings,
    /// JSON scenario describing tokens, configs and source readings
    pub scenario_path: PathBuf,
    /// Seconds between two polling rounds
    pub poll_interval_secs: u64,
    /// Polling rounds before exiting; 0 runs until ctrl-c
    pub ticks: u64,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            controller: ControllerSettings::default(),
            scenario_path: PathBuf::from("scenarios/base_rate.json"),
            poll_interval_secs: 10,
            ticks: 0,
        }
    }
}

impl KeeperConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let mut cfg = Self {
            controller: ControllerSettings::load()?,
            ..Self::default()
        };

        if let Ok(path) = std::env::var("RATEKEEPER_SCENARIO") {
            cfg.scenario_path = PathBuf::from(path);
        }
        if let Some(v) = parse_var("RATEKEEPER_POLL_SECS") {
            cfg.poll_interval_secs = v;
        }
        if let Some(v) = parse_var("RATEKEEPER_TICKS") {
            cfg.ticks = v;
        }

        // tokio intervals panic on a zero period
        cfg.poll_interval_secs = cfg.poll_interval_secs.max(1);

        Ok(cfg)
    }
}
