//! Error types for the Ratekeeper rate controller
//!
//! Provides a unified error type and the domain-specific variants it wraps

use thiserror::Error;

use crate::types::address::Address;

/// Result type alias using RateError
pub type Result<T> = std::result::Result<T, RateError>;

/// Unified error type for rate controller operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RateError {
    // Configuration errors
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    // Authorization errors
    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    // Historical buffer errors
    #[error("Rate buffer error: {0}")]
    Buffer(#[from] BufferError),

    // External data source errors
    #[error("Data source error: {0}")]
    Source(#[from] SourceError),

    #[error("Missing config for token {0}")]
    MissingConfig(Address),

    #[error("No observation stored for token {0}")]
    NoObservation(Address),

    #[error("Failed to accrue interest for token {token}: {reason}")]
    FailedToAccrueInterest { token: Address, reason: String },

    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    #[error("Amount must be positive")]
    InvalidAmount,
}

impl RateError {
    /// Shorthand for an overflow raised while computing `context`
    pub fn overflow(context: impl Into<String>) -> Self {
        RateError::ArithmeticOverflow(context.into())
    }
}

/// Config validation errors, raised at write time and never stored
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("min {min} exceeds max {max}")]
    MinAboveMax { min: u128, max: u128 },

    #[error("max percent decrease {bps} exceeds 10000 bps")]
    PercentDecreaseTooLarge { bps: u32 },

    #[error("duplicate component source {0}")]
    DuplicateComponent(Address),

    #[error("zero denominator in {term}")]
    ZeroDenominator { term: &'static str },

    #[error("input source must not be the zero address")]
    MissingInputSource,

    #[error("invalid settings: {0}")]
    Settings(String),
}

/// Authorization errors, raised before any state is read
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("{caller} is missing role {role}")]
    MissingRole { caller: Address, role: String },

    #[error("Roles are managed by an external access control registry")]
    ManagedExternally,
}

/// Historical rate buffer errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Updates are paused")]
    Paused,

    #[error("Invalid capacity: requested {requested}, current {current}, limit {limit}")]
    InvalidCapacity {
        current: usize,
        requested: usize,
        limit: usize,
    },

    #[error("Insufficient data: requested {requested}, available {available}")]
    InsufficientData { requested: usize, available: usize },
}

/// Errors reported by external value and input sources
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Source {source_ref} unavailable for token {token}")]
    Unavailable { source_ref: Address, token: Address },

    #[error("Source {0} is not registered")]
    Unregistered(Address),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RateError::Config(ConfigError::MinAboveMax { min: 5, max: 3 });
        assert!(err.to_string().contains("min 5 exceeds max 3"));
    }

    #[test]
    fn test_buffer_error_conversion() {
        let err: RateError = BufferError::InvalidCapacity {
            current: 8,
            requested: 4,
            limit: 65535,
        }
        .into();
        assert!(matches!(
            err,
            RateError::Buffer(BufferError::InvalidCapacity { requested: 4, .. })
        ));
    }

    #[test]
    fn test_source_errors_convert_into_source_variant() {
        let token = Address::repeat_byte(0x01);
        let source_ref = Address::repeat_byte(0x50);
        let err: RateError = SourceError::Unavailable { source_ref, token }.into();
        assert_eq!(
            err,
            RateError::Source(SourceError::Unavailable { source_ref, token })
        );

        let err: RateError = SourceError::Unregistered(source_ref).into();
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_accrual_error_mentions_token() {
        let token = Address::repeat_byte(0xab);
        let err = RateError::FailedToAccrueInterest {
            token,
            reason: "market closed".into(),
        };
        assert!(err.to_string().contains(&token.to_string()));
    }
}
