use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rover pose as reported by the simulator once per tick.
///
/// Angles are in degrees. `yaw` is measured counter-clockwise from the world
/// +X axis and wraps in `[0, 360)`; `pitch` and `roll` use the same wrapping
/// convention, so a level rover reports values near `0` or near `360`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// World-frame X position (world units, one unit per map cell).
    pub x: f32,
    /// World-frame Y position.
    pub y: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Pose {
    /// A level pose at `(x, y)` facing `yaw` degrees.
    pub fn new(x: f32, y: f32, yaw: f32) -> Self {
        Self {
            x,
            y,
            yaw,
            pitch: 0.0,
            roll: 0.0,
        }
    }

    /// Euclidean distance between the positions of two poses.
    pub fn distance_to(&self, other: &Pose) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Per-tick telemetry snapshot supplied by the simulator transport.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Telemetry {
    pub pose: Pose,
    /// Forward velocity (simulator units, m/s).
    pub vel: f32,
    /// `true` when the rover is close enough to a sample to pick it up.
    pub near_sample: bool,
    /// `true` while the simulator is running a pickup sequence.
    pub picking_up: bool,
}

/// Actuator command emitted by the behaviour controller.
///
/// `steer` is in degrees (positive = left), `throttle` is a normalised
/// effort in roughly `[-1, 1]`, and `brake` is a non-negative magnitude in
/// simulator units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActuatorCommand {
    pub throttle: f32,
    pub brake: f32,
    pub steer: f32,
    /// Request the simulator to start a sample pickup.
    pub send_pickup: bool,
}

impl ActuatorCommand {
    /// A command with every actuator released.
    pub fn idle() -> Self {
        Self::default()
    }

    /// A command that holds the rover in place with the given brake force.
    pub fn halt(brake: f32) -> Self {
        Self {
            brake,
            ..Self::default()
        }
    }
}

/// Rover-centric polar observations for one classified mask.
///
/// `dists[i]` and `angles[i]` describe the same pixel. Angles are radians,
/// `0` is straight ahead and positive values are to the left.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolarObservations {
    pub dists: Vec<f32>,
    pub angles: Vec<f32>,
}

impl PolarObservations {
    pub fn new(dists: Vec<f32>, angles: Vec<f32>) -> Self {
        debug_assert_eq!(dists.len(), angles.len());
        Self { dists, angles }
    }

    /// Number of observed pixels.
    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    /// Mean angle in degrees, or `None` when there are no observations.
    pub fn mean_angle_deg(&self) -> Option<f32> {
        if self.angles.is_empty() {
            return None;
        }
        let sum: f32 = self.angles.iter().map(|a| a.to_degrees()).sum();
        Some(sum / self.angles.len() as f32)
    }

    /// Iterate `(dist, angle)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.dists.iter().copied().zip(self.angles.iter().copied())
    }
}

/// The three observation sets produced by one perception pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameObservations {
    pub navigable: PolarObservations,
    pub obstacles: PolarObservations,
    pub rocks: PolarObservations,
}

/// Workspace-wide error type.
///
/// Degenerate sensor input (empty masks, no rocks in view) is never an
/// error; these variants cover startup configuration problems, output
/// rejection, and I/O at the CLI boundary.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProspectorError {
    #[error("Invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("Invalid configuration for {field}: {details}")]
    InvalidConfig { field: String, details: String },

    #[error("Command rejected by {rule}: {details}")]
    CommandRejected { rule: String, details: String },

    #[error("Rover state lock poisoned")]
    StatePoisoned,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Image error: {0}")]
    Image(String),
}

impl ProspectorError {
    pub fn invalid_config(field: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_angle_of_empty_set_is_none() {
        let obs = PolarObservations::default();
        assert!(obs.is_empty());
        assert_eq!(obs.mean_angle_deg(), None);
    }

    #[test]
    fn mean_angle_converts_to_degrees() {
        let obs = PolarObservations::new(
            vec![1.0, 1.0],
            vec![std::f32::consts::FRAC_PI_4, std::f32::consts::FRAC_PI_4 * 3.0],
        );
        let mean = obs.mean_angle_deg().unwrap();
        assert!((mean - 90.0).abs() < 1e-3);
    }

    #[test]
    fn pose_distance() {
        let a = Pose::new(0.0, 0.0, 0.0);
        let b = Pose::new(3.0, 4.0, 90.0);
        assert!((a.distance_to(&b) - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn halt_command_only_brakes() {
        let cmd = ActuatorCommand::halt(10.0);
        assert_eq!(cmd.throttle, 0.0);
        assert_eq!(cmd.steer, 0.0);
        assert_eq!(cmd.brake, 10.0);
        assert!(!cmd.send_pickup);
    }

    #[test]
    fn telemetry_roundtrip() {
        let t = Telemetry {
            pose: Pose::new(99.7, 85.6, 56.8),
            vel: 1.2,
            near_sample: true,
            picking_up: false,
        };
        let json = serde_json::to_string(&t).unwrap();
        let back: Telemetry = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }

    #[test]
    fn error_display() {
        let err = ProspectorError::invalid_config("perception.world_size", "must be > 0");
        assert!(err.to_string().contains("perception.world_size"));

        let err = ProspectorError::CommandRejected {
            rule: "steer_limit".to_string(),
            details: "steer 20 exceeds 15".to_string(),
        };
        assert!(err.to_string().contains("steer_limit"));
    }
}
