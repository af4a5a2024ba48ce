//! # Ratekeeper Common
//!
//! Shared types, errors, and exact arithmetic for the Ratekeeper bounded
//! rate controller.
//!
//! ## Core Types
//!
//! - [`Address`]: 20-byte reference used for tokens, data sources and callers
//! - [`RateConfig`]: per-token bounds, rate-of-change limits and weighted components
//! - [`Observation`]: a stored `(target, rate, timestamp)` triple
//!
//! ## Math
//!
//! - [`math::fraction`]: signed `(numerator, denominator)` pairs combined exactly in 256 bits
//! - [`math::bps`]: basis-point helpers used by the percentage clamps

pub mod error;
pub mod math;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{
    AuthorizationError, BufferError, ConfigError, RateError, Result, SourceError,
};
pub use math::{
    bps::{apply_bps, BPS_DENOMINATOR},
    fraction::{Fraction, RationalSum},
};
pub use types::{
    address::Address,
    observation::Observation,
    rate_config::{RateComponent, RateConfig},
};

/// Ratekeeper version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 100% expressed in basis points
pub const MAX_PERCENT_BPS: u32 = 10_000;

/// Upper bound on the number of observations a single token may retain
pub const MAX_RATES_CAPACITY: usize = u16::MAX as usize;

/// Fixed-point scale conventionally used for rates (1e18 = 100%)
pub const RATE_SCALE: u128 = 1_000_000_000_000_000_000;

/// Number of decimals in [`RATE_SCALE`]
pub const RATE_DECIMALS: u32 = 18;
