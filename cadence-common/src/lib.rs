//! # Cadence Common Library
//!
//! Shared code for the Cadence session audio crates:
//! - Error types
//! - Session event types and the broadcast EventBus
//! - Exponential gain ramp math used by the ducking controller and simulated host
//! - Configuration file resolution

pub mod config;
pub mod error;
pub mod events;
pub mod gain_ramp;

pub use error::{Error, Result};
pub use gain_ramp::{ExponentialRamp, MIN_RAMP_TARGET};
