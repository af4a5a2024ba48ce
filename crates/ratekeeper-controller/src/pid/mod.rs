//! PID feedback path
//!
//! A token with a [`PidConfig`] derives its candidate from the previous
//! stored rate plus a PID delta instead of the weighted aggregate. All terms
//! are combined as one exact rational and divided once.

pub mod calculator;
pub mod config;
pub mod transformer;

pub use calculator::{PidCalculator, PidState, PidStep, PidTerms};
pub use config::PidConfig;
pub use transformer::{
    ErrorTransformer, InputAndErrorTransformer, NegativeErrorScalingTransformer,
    PositiveErrorScalingTransformer,
};
