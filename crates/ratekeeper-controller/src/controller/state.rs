use ratekeeper_common::{Observation, RateConfig};
use serde::{Deserialize, Serialize};

use crate::buffer::RateBuffer;
use crate::pid::{PidConfig, PidState};

/// Lifecycle state of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenStatus {
    /// No config has ever been written
    Unconfigured,
    /// Configured, no observation stored yet
    Configured,
    /// Accepting updates, at least one observation stored
    Active,
    /// Updates rejected, reads still served
    Paused,
}

/// Result of a successful `update` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A new observation was stored
    Updated(Observation),
    /// The minimum period has not elapsed; nothing changed
    NotDue { next_update_at: u64 },
    /// The PID input source could not answer; the period was skipped
    InputUnavailable,
}

impl UpdateOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, UpdateOutcome::Updated(_))
    }

    pub fn observation(&self) -> Option<Observation> {
        match self {
            UpdateOutcome::Updated(observation) => Some(*observation),
            _ => None,
        }
    }
}

/// PID config together with the state it has accumulated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PidSlot {
    pub config: PidConfig,
    pub state: PidState,
}

/// Everything the controller stores for one token
#[derive(Debug, Clone)]
pub(crate) struct TokenState {
    pub config: RateConfig,
    pub pid: Option<PidSlot>,
    pub buffer: RateBuffer,
}

impl TokenState {
    pub fn new(config: RateConfig, buffer: RateBuffer) -> Self {
        Self {
            config,
            pid: None,
            buffer,
        }
    }

    pub fn status(&self) -> TokenStatus {
        if self.buffer.is_paused() {
            TokenStatus::Paused
        } else if self.buffer.is_empty() {
            TokenStatus::Configured
        } else {
            TokenStatus::Active
        }
    }
}
