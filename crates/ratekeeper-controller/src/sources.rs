//! External collaborators
//!
//! The controller never owns the lifecycle of the systems it reads from; it
//! only holds references to them, keyed by address:
//! - [`ValueSource`]: scalar reading per token (balances, utilization, prices)
//! - [`InputAndTargetSource`]: `(input, target)` pair consumed by the PID path
//! - [`AccrualNotifier`]: money market hook called before a new rate is stored
//!
//! All calls are synchronous and either answer or fail immediately.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use ratekeeper_common::{Address, SourceError};
use thiserror::Error;

/// Reads a scalar value for a token
pub trait ValueSource: Send + Sync {
    fn get_value(&self, token: Address) -> Result<u128, SourceError>;
}

/// Reads the measured input and its target for a token
pub trait InputAndTargetSource: Send + Sync {
    fn get_input_and_target(&self, token: Address) -> Result<(i128, i128), SourceError>;
}

/// Rejection reported by a money market when it cannot accrue
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct AccrualError(pub String);

/// Notified before a token's stored rate changes
#[cfg_attr(test, mockall::automock)]
pub trait AccrualNotifier: Send + Sync {
    fn on_rate_about_to_change(&self, token: Address) -> Result<(), AccrualError>;
}

/// Lookup table from source address to collaborator
#[derive(Default, Clone)]
pub struct SourceRegistry {
    values: HashMap<Address, Arc<dyn ValueSource>>,
    inputs: HashMap<Address, Arc<dyn InputAndTargetSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value source under `address`, replacing any previous one
    pub fn register_value_source(&mut self, address: Address, source: Arc<dyn ValueSource>) {
        self.values.insert(address, source);
    }

    /// Register an input/target source under `address`
    pub fn register_input_source(
        &mut self,
        address: Address,
        source: Arc<dyn InputAndTargetSource>,
    ) {
        self.inputs.insert(address, source);
    }

    pub fn value_source(&self, address: Address) -> Result<&Arc<dyn ValueSource>, SourceError> {
        self.values
            .get(&address)
            .ok_or(SourceError::Unregistered(address))
    }

    pub fn input_source(
        &self,
        address: Address,
    ) -> Result<&Arc<dyn InputAndTargetSource>, SourceError> {
        self.inputs
            .get(&address)
            .ok_or(SourceError::Unregistered(address))
    }

    pub fn value_source_count(&self) -> usize {
        self.values.len()
    }

    pub fn input_source_count(&self) -> usize {
        self.inputs.len()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("values", &self.values.keys().collect::<Vec<_>>())
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// In-memory value source with per-token readings.
///
/// Tokens without a reading report [`SourceError::Unavailable`].
pub struct StaticValueSource {
    address: Address,
    values: RwLock<HashMap<Address, u128>>,
}

impl StaticValueSource {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn set(&self, token: Address, value: u128) {
        self.values.write().insert(token, value);
    }

    pub fn clear(&self, token: Address) {
        self.values.write().remove(&token);
    }
}

impl ValueSource for StaticValueSource {
    fn get_value(&self, token: Address) -> Result<u128, SourceError> {
        self.values
            .read()
            .get(&token)
            .copied()
            .ok_or(SourceError::Unavailable {
                source_ref: self.address,
                token,
            })
    }
}

/// In-memory input/target source
pub struct StaticInputSource {
    address: Address,
    values: RwLock<HashMap<Address, (i128, i128)>>,
}

impl StaticInputSource {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn set(&self, token: Address, input: i128, target: i128) {
        self.values.write().insert(token, (input, target));
    }

    pub fn clear(&self, token: Address) {
        self.values.write().remove(&token);
    }
}

impl InputAndTargetSource for StaticInputSource {
    fn get_input_and_target(&self, token: Address) -> Result<(i128, i128), SourceError> {
        self.values
            .read()
            .get(&token)
            .copied()
            .ok_or(SourceError::Unavailable {
                source_ref: self.address,
                token,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_value_source() {
        let source = StaticValueSource::new(Address::repeat_byte(0x10));
        let token = Address::repeat_byte(0x01);

        assert!(matches!(
            source.get_value(token),
            Err(SourceError::Unavailable { .. })
        ));

        source.set(token, 42);
        assert_eq!(source.get_value(token), Ok(42));

        source.clear(token);
        assert!(source.get_value(token).is_err());
    }

    #[test]
    fn test_registry_lookup() {
        let address = Address::repeat_byte(0x10);
        let mut registry = SourceRegistry::new();
        registry.register_value_source(address, Arc::new(StaticValueSource::new(address)));

        assert!(registry.value_source(address).is_ok());
        assert_eq!(
            registry.value_source(Address::repeat_byte(0x11)).err(),
            Some(SourceError::Unregistered(Address::repeat_byte(0x11)))
        );
        assert!(registry.input_source(address).is_err());
    }

    #[test]
    fn test_static_input_source() {
        let source = StaticInputSource::new(Address::repeat_byte(0x20));
        let token = Address::repeat_byte(0x01);

        source.set(token, -3, 7);
        assert_eq!(source.get_input_and_target(token), Ok((-3, 7)));
    }
}
