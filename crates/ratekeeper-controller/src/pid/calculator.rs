//! Discrete PID step
//!
//! ```text
//! error    = target - input
//! (i', e') = transformer(input, error)
//! P        = proportional_on_measurement ? -i' : e'
//! I       += kI·e'
//! D        = derivative_on_measurement ? -(i' - prev_i') : e' - prev_e'
//! delta    = kP·P + I + kD·D        (one exact rational, divided once)
//! ```
//!
//! The integral is kept as an exact rational of already-weighted errors, so a
//! new kI only applies to the errors that follow it.
//!
//! The first step after (re)initialisation seeds the previous values with
//! the current ones, so D starts at zero.

use ratekeeper_common::math::{i256_from_i128, I256};
use ratekeeper_common::{RateError, RationalSum, Result};

use super::config::PidConfig;
use super::transformer::InputAndErrorTransformer;

/// State carried between PID steps for one token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidState {
    /// Running sum of kI-weighted transformed errors
    pub integral: RationalSum,
    pub previous_error: I256,
    pub previous_input: I256,
    /// False until the first step has seeded the previous values
    pub initialized: bool,
}

impl PidState {
    pub fn new() -> Self {
        Self {
            integral: RationalSum::zero(),
            previous_error: I256::ZERO,
            previous_input: I256::ZERO,
            initialized: false,
        }
    }

    /// Current integral contribution, truncated toward zero
    pub fn integral_term(&self) -> Result<I256> {
        self.integral.truncate()
    }
}

impl Default for PidState {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw P and D values of one step, with the truncated integral contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidTerms {
    pub proportional: I256,
    pub integral: I256,
    pub derivative: I256,
}

/// Outcome of one step; `state` replaces the stored state only when the
/// resulting rate is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidStep {
    pub delta: I256,
    /// Transformed error
    pub error: I256,
    pub terms: PidTerms,
    pub state: PidState,
}

pub struct PidCalculator;

impl PidCalculator {
    pub fn step(config: &PidConfig, state: &PidState, input: i128, target: i128) -> Result<PidStep> {
        let raw_input = i256_from_i128(input)?;
        let raw_error = i256_from_i128(target)?
            .checked_sub(raw_input)
            .ok_or_else(|| RateError::overflow("pid error"))?;

        let (input, error) = match &config.transformer {
            Some(transformer) => transformer.transform(raw_input, raw_error)?,
            None => (raw_input, raw_error),
        };

        let (previous_input, previous_error) = if state.initialized {
            (state.previous_input, state.previous_error)
        } else {
            (input, error)
        };

        let proportional = if config.proportional_on_measurement {
            negate(input, "pid proportional")?
        } else {
            error
        };

        let integral = state.integral.add_term(config.ki, error)?;

        let derivative = if config.derivative_on_measurement {
            let change = input
                .checked_sub(previous_input)
                .ok_or_else(|| RateError::overflow("pid input change"))?;
            negate(change, "pid derivative")?
        } else {
            error
                .checked_sub(previous_error)
                .ok_or_else(|| RateError::overflow("pid error change"))?
        };

        let delta = RationalSum::zero()
            .add_term(config.kp, proportional)?
            .add_term(config.kd, derivative)?
            .add(integral)?
            .truncate()?;

        Ok(PidStep {
            delta,
            error,
            terms: PidTerms {
                proportional,
                integral: integral.truncate()?,
                derivative,
            },
            state: PidState {
                integral,
                previous_error: error,
                previous_input: input,
                initialized: true,
            },
        })
    }
}

fn negate(value: I256, context: &str) -> Result<I256> {
    value
        .checked_neg()
        .ok_or_else(|| RateError::overflow(context))
}
