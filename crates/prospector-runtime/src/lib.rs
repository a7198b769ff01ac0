//! `prospector-runtime` – the rover's decision loop.
//!
//! # Modules
//!
//! - [`controller`] – [`BehaviorController`][controller::BehaviorController]:
//!   the mode state machine (forward, stop, reverse, approach sample) that
//!   turns observations and telemetry into actuator commands.
//! - [`state`] – [`RoverState`][state::RoverState] and [`Mode`][state::Mode]:
//!   everything carried from one tick to the next.
//! - [`stuck`] – [`StuckDetector`][stuck::StuckDetector]: flags a rover that
//!   has not moved far enough within a time window.
//! - [`steering`] – [`SteeringLimiter`][steering::SteeringLimiter]: range
//!   clamp and per-tick slew limit.
//! - [`config`] – [`DriveConfig`][config::DriveConfig]: set-points and
//!   thresholds.
//! - [`rover_loop`] – [`RoverLoop`][rover_loop::RoverLoop]: perceive, decide
//!   and verify once per frame.
//! - [`shared`] – [`SharedRoverLoop`][shared::SharedRoverLoop]: the same loop
//!   behind a mutex for multi-threaded callers.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with optional OTLP export.
//!
//! # Output verification
//!
//! Every command leaving [`RoverLoop`] has passed the
//! [`CommandVerifier`] from `prospector-kernel`, re-exported here so callers
//! can extend it without a direct dependency.

pub mod config;
pub mod controller;
pub mod rover_loop;
pub mod shared;
pub mod state;
pub mod steering;
pub mod stuck;
pub mod telemetry;

pub use config::{DriveConfig, FallbackMode, SpeedBand};
pub use controller::BehaviorController;
pub use rover_loop::{RoverLoop, TickOutput};
pub use shared::SharedRoverLoop;
pub use state::{Mode, RoverState, TurnDirection};
pub use steering::SteeringLimiter;
pub use stuck::StuckDetector;
pub use telemetry::{TracerProviderGuard, init_tracing};

pub use prospector_kernel::CommandVerifier;
