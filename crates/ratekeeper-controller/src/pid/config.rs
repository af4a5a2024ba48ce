use ratekeeper_common::{Address, ConfigError, Fraction};
use serde::{Deserialize, Serialize};

use super::transformer::ErrorTransformer;

/// Per-token PID configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidConfig {
    /// Source answering `(input, target)` for the token
    pub input_source: Address,
    pub kp: Fraction,
    pub ki: Fraction,
    pub kd: Fraction,
    /// Applied to `(input, error)` before any term is computed
    #[serde(default)]
    pub transformer: Option<ErrorTransformer>,
    /// P term from `-input` instead of the error
    #[serde(default)]
    pub proportional_on_measurement: bool,
    /// D term from the input trajectory instead of the error trajectory
    #[serde(default)]
    pub derivative_on_measurement: bool,
}

impl PidConfig {
    /// Config with the given gains, identity transformer and error-based terms
    pub fn new(input_source: Address, kp: Fraction, ki: Fraction, kd: Fraction) -> Self {
        Self {
            input_source,
            kp,
            ki,
            kd,
            transformer: None,
            proportional_on_measurement: false,
            derivative_on_measurement: false,
        }
    }

    pub fn with_transformer(mut self, transformer: impl Into<ErrorTransformer>) -> Self {
        self.transformer = Some(transformer.into());
        self
    }

    pub fn with_proportional_on_measurement(mut self, enabled: bool) -> Self {
        self.proportional_on_measurement = enabled;
        self
    }

    pub fn with_derivative_on_measurement(mut self, enabled: bool) -> Self {
        self.derivative_on_measurement = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_source.is_zero() {
            return Err(ConfigError::MissingInputSource);
        }

        self.kp.validate("kP")?;
        self.ki.validate("kI")?;
        self.kd.validate("kD")?;

        if let Some(transformer) = &self.transformer {
            transformer.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pid::NegativeErrorScalingTransformer;

    fn sample() -> PidConfig {
        PidConfig::new(
            Address::repeat_byte(0x42),
            Fraction::new(1, 10),
            Fraction::new(1, 100),
            Fraction::ZERO,
        )
    }

    #[test]
    fn test_valid() {
        assert!(sample().validate().is_ok());
        assert!(sample()
            .with_transformer(NegativeErrorScalingTransformer::new(2, 1))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_zero_input_source() {
        let mut config = sample();
        config.input_source = Address::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::MissingInputSource));
    }

    #[test]
    fn test_zero_denominators() {
        let mut config = sample();
        config.ki = Fraction::new(1, 0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDenominator { term: "kI" })
        );

        let config = sample().with_transformer(NegativeErrorScalingTransformer::new(2, 0));
        assert!(config.validate().is_err());
    }
}
