//! Integer arithmetic helpers
//!
//! No floating point anywhere: percentages are basis points and PID gains are
//! `(numerator, denominator)` pairs combined exactly in 256 bits.

pub mod bps;
pub mod fraction;

pub use alloy_primitives::I256;

use crate::error::{RateError, Result};

/// Widen a signed 128-bit value
pub fn i256_from_i128(value: i128) -> Result<I256> {
    I256::try_from(value).map_err(|_| RateError::overflow("i128 -> i256"))
}

/// Widen an unsigned 128-bit value
pub fn i256_from_u128(value: u128) -> Result<I256> {
    I256::try_from(value).map_err(|_| RateError::overflow("u128 -> i256"))
}

/// Narrow to an unsigned rate, saturating at `0` and `u128::MAX`
pub fn saturating_u128(value: I256) -> u128 {
    if value.is_negative() {
        0
    } else {
        u128::try_from(value).unwrap_or(u128::MAX)
    }
}
