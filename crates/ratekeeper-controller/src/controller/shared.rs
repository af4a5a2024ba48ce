//! Shared controller handle
//!
//! Serializes every call behind one mutex so concurrent callers observe the
//! same one-call-at-a-time semantics as a single owner.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use ratekeeper_common::{Address, Result};

use super::rate_controller::RateController;
use super::state::UpdateOutcome;

/// Cloneable, thread-safe handle to a [`RateController`]
#[derive(Clone)]
pub struct SharedRateController {
    inner: Arc<Mutex<RateController>>,
}

impl SharedRateController {
    pub fn new(controller: RateController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    /// Exclusive access for a sequence of calls
    pub fn lock(&self) -> MutexGuard<'_, RateController> {
        self.inner.lock()
    }

    /// Run `f` with exclusive access
    pub fn with<R>(&self, f: impl FnOnce(&mut RateController) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn update(&self, caller: Address, token: Address) -> Result<UpdateOutcome> {
        self.inner.lock().update(caller, token)
    }

    pub fn compute_rate(&self, token: Address) -> Result<u128> {
        self.inner.lock().compute_rate(token)
    }

    pub fn needs_update(&self, token: Address) -> bool {
        self.inner.lock().needs_update(token)
    }
}

impl std::fmt::Debug for SharedRateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRateController").finish_non_exhaustive()
    }
}
