//! JSON scenario: tokens, their configs, and the readings served by the
//! in-memory sources

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use ratekeeper_controller::{
    Address, AuthorizationPolicy, ControllerSettings, PidConfig, RateConfig, RateController,
    SourceRegistry, StaticInputSource, StaticValueSource,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSetup {
    pub token: Address,
    pub config: RateConfig,
    #[serde(default)]
    pub pid: Option<PidConfig>,
    /// Buffer capacity to grow to after the first config
    #[serde(default)]
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueReading {
    pub source: Address,
    pub token: Address,
    pub value: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputReading {
    pub source: Address,
    pub token: Address,
    pub input: i128,
    pub target: i128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Owner of the self-managed policy; performs all setup calls
    pub owner: Address,
    /// Account the keeper calls `update` as
    pub keeper: Address,
    /// Grant `Updater` to the zero address instead of the keeper
    #[serde(default)]
    pub open_updating: bool,
    pub tokens: Vec<TokenSetup>,
    #[serde(default)]
    pub values: Vec<ValueReading>,
    #[serde(default)]
    pub inputs: Vec<InputReading>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid scenario JSON")
    }

    /// Build a controller serving the scenario's readings from static sources
    pub fn build(&self, settings: ControllerSettings) -> Result<RateController> {
        let mut value_sources: HashMap<Address, StaticValueSource> = HashMap::new();
        for reading in &self.values {
            value_sources
                .entry(reading.source)
                .or_insert_with(|| StaticValueSource::new(reading.source))
                .set(reading.token, reading.value);
        }

        let mut input_sources: HashMap<Address, StaticInputSource> = HashMap::new();
        for reading in &self.inputs {
            input_sources
                .entry(reading.source)
                .or_insert_with(|| StaticInputSource::new(reading.source))
                .set(reading.token, reading.input, reading.target);
        }

        let mut sources = SourceRegistry::new();
        for (address, source) in value_sources {
            sources.register_value_source(address, Arc::new(source));
        }
        for (address, source) in input_sources {
            sources.register_input_source(address, Arc::new(source));
        }

        let mut controller = RateController::new(
            settings,
            AuthorizationPolicy::self_managed(self.owner),
            sources,
        )?;

        let updater = if self.open_updating {
            Address::ZERO
        } else {
            self.keeper
        };
        controller.grant_updater(self.owner, updater)?;

        for setup in &self.tokens {
            controller
                .set_config(self.owner, setup.token, setup.config.clone())
                .with_context(|| format!("Rejected config for {}", setup.token))?;

            if let Some(pid) = setup.pid {
                controller
                    .set_pid_config(self.owner, setup.token, pid)
                    .with_context(|| format!("Rejected PID config for {}", setup.token))?;
            }

            if let Some(capacity) = setup.capacity {
                controller.set_rates_capacity(self.owner, setup.token, capacity)?;
            }
        }

        Ok(controller)
    }
}
