//! Stored rate observations

use serde::{Deserialize, Serialize};

/// A single entry of the historical rate buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Observation {
    /// Candidate rate before clamping
    pub target: u128,
    /// Effective (clamped) rate
    pub rate: u128,
    /// Unix timestamp in seconds
    pub timestamp: u64,
}

impl Observation {
    pub fn new(target: u128, rate: u128, timestamp: u64) -> Self {
        Self {
            target,
            rate,
            timestamp,
        }
    }
}
