//! # Ratekeeper Controller
//!
//! Bounded rate controller for lending markets: derives a per-token rate from
//! external market data and keeps it inside configured bounds.
//!
//! ## Update pipeline
//!
//! ```text
//! authorize -> pause gate -> timing gate -> candidate -> clamp -> accrue -> store
//! ```
//!
//! The candidate comes from one of two paths:
//! - Aggregator: `base + Σ(wᵢ × readingᵢ) / Σwᵢ`
//! - PID: `previous + (kP·P + kI·ΣI + kD·D)` with exact rational arithmetic
//!
//! The clamp engine then bounds it to the additive and percentage
//! rate-of-change windows around the previous rate, and finally to
//! `[min, max]`.

pub mod aggregator;
pub mod auth;
pub mod buffer;
pub mod clamp;
pub mod clock;
pub mod controller;
pub mod events;
pub mod pid;
pub mod settings;
pub mod sources;

pub use aggregator::{AggregationBreakdown, ComponentReading, RateAggregator};
pub use auth::{AuthorizationPolicy, ExternalAccessControl, ExternalAclAdapter, RoleKind, RoleRegistry};
pub use buffer::RateBuffer;
pub use clamp::{ClampBound, ClampEngine, ClampOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{RateController, SharedRateController, TokenStatus, UpdateOutcome};
pub use events::{EventLog, EventSink, MemoryEventSink, RateEvent, RateEventKind, TracingEventSink};
pub use pid::{
    ErrorTransformer, InputAndErrorTransformer, NegativeErrorScalingTransformer, PidCalculator,
    PidConfig, PidState, PidStep, PidTerms, PositiveErrorScalingTransformer,
};
pub use settings::ControllerSettings;
pub use sources::{
    AccrualError, AccrualNotifier, InputAndTargetSource, SourceRegistry, StaticInputSource,
    StaticValueSource, ValueSource,
};

pub use ratekeeper_common::{
    Address, Fraction, Observation, RateComponent, RateConfig, RateError, Result,
};
