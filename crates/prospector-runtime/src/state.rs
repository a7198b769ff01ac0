//! Mutable rover state carried between controller ticks.

use std::fmt;
use std::time::Instant;

use prospector_types::{ActuatorCommand, FrameObservations, Pose, Telemetry};

use crate::config::DriveConfig;
use crate::stuck::StuckDetector;

/// Active behaviour. Exactly one is in effect per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Cruise along the mean navigable bearing.
    #[default]
    Forward,
    /// Brake to a halt, then turn in place until the way ahead clears.
    Stop,
    /// Back up at fixed throttle after being stuck.
    Reverse { since: Instant },
    /// Creep toward a detected sample rock.
    ApproachSample,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Forward => "forward",
            Mode::Stop => "stop",
            Mode::Reverse { .. } => "reverse",
            Mode::ApproachSample => "approach_sample",
        }
    }

    /// `true` when `other` is the same variant, ignoring payloads.
    pub fn same_kind(&self, other: &Mode) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Side chosen for an in-place turn while stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// Signed steering angle for a full-lock turn.
    pub fn steer(self, max_steer: f32) -> f32 {
        match self {
            TurnDirection::Left => max_steer,
            TurnDirection::Right => -max_steer,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoverState {
    pub telemetry: Telemetry,
    /// `None` until the first perception pass has completed.
    pub observations: Option<FrameObservations>,
    pub mode: Mode,
    pub stuck: StuckDetector,
    /// Steering emitted on the previous tick.
    pub previous_steer: f32,
    /// Committed in-place turn direction while stopped and blocked.
    pub turn_commitment: Option<TurnDirection>,
    /// Position where the current reverse manoeuvre started.
    pub reverse_origin: Option<Pose>,
    /// Last command emitted to the actuators.
    pub command: ActuatorCommand,
}

impl RoverState {
    pub fn new(config: &DriveConfig) -> Self {
        Self {
            telemetry: Telemetry::default(),
            observations: None,
            mode: Mode::default(),
            stuck: StuckDetector::new(config.stuck_timeout(), config.stuck_min_displacement),
            previous_steer: 0.0,
            turn_commitment: None,
            reverse_origin: None,
            command: ActuatorCommand::idle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state() {
        let s = RoverState::new(&DriveConfig::default());
        assert_eq!(s.mode, Mode::Forward);
        assert!(s.observations.is_none());
        assert_eq!(s.command, ActuatorCommand::idle());
    }

    #[test]
    fn mode_names_and_kind() {
        let t = Instant::now();
        assert_eq!(Mode::ApproachSample.to_string(), "approach_sample");
        assert_eq!(Mode::Reverse { since: t }.name(), "reverse");
        assert!(Mode::Reverse { since: t }.same_kind(&Mode::Reverse {
            since: t + std::time::Duration::from_secs(1)
        }));
        assert!(!Mode::Forward.same_kind(&Mode::Stop));
    }

    #[test]
    fn turn_direction_sign() {
        assert_eq!(TurnDirection::Left.steer(15.0), 15.0);
        assert_eq!(TurnDirection::Right.steer(15.0), -15.0);
    }
}
