//! Rate controller state machine
//!
//! Per-token lifecycle: `Unconfigured -> Configured -> (Active | Paused)`.
//! All per-token state lives in an explicit keyed store owned by the
//! controller instance.

pub mod rate_controller;
pub mod shared;
pub mod state;

pub use rate_controller::RateController;
pub use shared::SharedRateController;
pub use state::{TokenStatus, UpdateOutcome};
