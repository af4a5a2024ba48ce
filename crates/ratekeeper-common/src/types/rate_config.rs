//! Per-token rate configuration
//!
//! A [`RateConfig`] is replaced as a whole and validated on every write:
//! - `min <= max`
//! - `max_percent_decrease <= 10000` bps, so a decrease can never go below zero
//! - every component source appears at most once

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::address::Address;
use crate::MAX_PERCENT_BPS;

/// A weighted dynamic component of the rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateComponent {
    /// Value source queried for this component
    pub source: Address,
    /// Relative weight
    pub weight: u64,
}

impl RateComponent {
    pub fn new(source: Address, weight: u64) -> Self {
        Self { source, weight }
    }
}

/// Rate bounds, rate-of-change limits and components for one token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateConfig {
    /// Absolute upper bound
    pub max: u128,
    /// Absolute lower bound
    pub min: u128,
    /// Largest additive increase per update
    pub max_increase: u128,
    /// Largest additive decrease per update
    pub max_decrease: u128,
    /// Largest relative increase per update (bps)
    pub max_percent_increase: u32,
    /// Largest relative decrease per update (bps, at most 10000)
    pub max_percent_decrease: u32,
    /// Constant rate added to the weighted component average
    pub base: u128,
    /// Weighted dynamic components
    #[serde(default)]
    pub components: Vec<RateComponent>,
}

impl RateConfig {
    /// A config that pins the rate to `base` with no rate-of-change limits
    pub fn fixed(base: u128) -> Self {
        Self {
            max: u128::MAX,
            min: 0,
            max_increase: u128::MAX,
            max_decrease: u128::MAX,
            max_percent_increase: u32::MAX,
            max_percent_decrease: MAX_PERCENT_BPS,
            base,
            components: vec![],
        }
    }

    /// Validate the config before it is stored
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::MinAboveMax {
                min: self.min,
                max: self.max,
            });
        }

        if self.max_percent_decrease > MAX_PERCENT_BPS {
            return Err(ConfigError::PercentDecreaseTooLarge {
                bps: self.max_percent_decrease,
            });
        }

        let mut seen = HashSet::with_capacity(self.components.len());
        for component in &self.components {
            if !seen.insert(component.source) {
                return Err(ConfigError::DuplicateComponent(component.source));
            }
        }

        Ok(())
    }

    /// Sum of all component weights, `None` on overflow
    pub fn total_weight(&self) -> Option<u128> {
        self.components
            .iter()
            .try_fold(0u128, |acc, c| acc.checked_add(c.weight as u128))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RateConfig {
        RateConfig {
            max: 1_000,
            min: 10,
            max_increase: 50,
            max_decrease: 50,
            max_percent_increase: 1_000,
            max_percent_decrease: 1_000,
            base: 100,
            components: vec![
                RateComponent::new(Address::repeat_byte(1), 3),
                RateComponent::new(Address::repeat_byte(2), 7),
            ],
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(sample().validate().is_ok());
        assert_eq!(sample().total_weight(), Some(10));
    }

    #[test]
    fn test_min_above_max() {
        let mut config = sample();
        config.min = 2_000;
        assert_eq!(
            config.validate(),
            Err(ConfigError::MinAboveMax {
                min: 2_000,
                max: 1_000
            })
        );
    }

    #[test]
    fn test_min_equal_max_is_valid() {
        let mut config = sample();
        config.min = config.max;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_percent_decrease_over_100() {
        let mut config = sample();
        config.max_percent_decrease = 10_001;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PercentDecreaseTooLarge { bps: 10_001 })
        ));
    }

    #[test]
    fn test_duplicate_component() {
        let mut config = sample();
        config.components.push(RateComponent::new(Address::repeat_byte(1), 1));
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateComponent(Address::repeat_byte(1)))
        );
    }

    #[test]
    fn test_fixed_config() {
        let config = RateConfig::fixed(42);
        assert!(config.validate().is_ok());
        assert_eq!(config.total_weight(), Some(0));
    }

    #[test]
    fn test_config_json() {
        let json = r#"{
            "max": 1000, "min": 0, "max_increase": 10, "max_decrease": 10,
            "max_percent_increase": 100, "max_percent_decrease": 100, "base": 5
        }"#;
        let config: RateConfig = serde_json::from_str(json).unwrap();
        assert!(config.components.is_empty());
        assert_eq!(config.base, 5);
    }
}
