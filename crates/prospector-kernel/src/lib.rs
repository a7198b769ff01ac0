//! `prospector-kernel` – output interlocks.
//!
//! Nothing here decides what the rover should do; it only refuses commands
//! that must never reach the actuators.
//!
//! # Modules
//!
//! - [`command_verifier`] – [`CommandVerifier`][command_verifier::CommandVerifier]:
//!   a rule engine that validates every
//!   [`ActuatorCommand`][prospector_types::ActuatorCommand] against registered
//!   invariants (finite values, steering range, throttle range, brake sign).

pub mod command_verifier;

pub use command_verifier::{
    BrakeRule, CommandVerifier, FiniteRule, Rule, SteerLimitRule, ThrottleRangeRule,
};
