//! Core types for the rate controller

pub mod address;
pub mod observation;
pub mod rate_config;
