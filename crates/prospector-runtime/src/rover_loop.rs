//! [`RoverLoop`] – per-frame orchestrator.
//!
//! Each tick:
//!
//! 1. **Perceive** – run [`PerceptionStep`] on the frame, update the
//!    [`WorldMap`] and store the observations in [`RoverState`].
//! 2. **Decide** – run the [`BehaviorController`] for the current telemetry.
//! 3. **Verify** – pass the command through the [`CommandVerifier`]. A
//!    rejected command is logged and replaced by a halt.
//!
//! `perceive` and `decide` are also exposed separately for callers that run
//! vision and control on different schedules.

use std::time::Instant;

use image::RgbImage;
use prospector_kernel::CommandVerifier;
use prospector_perception::{PerceptionConfig, PerceptionOutput, PerceptionStep, WorldMap};
use prospector_types::{ActuatorCommand, ProspectorError, Telemetry};
use tracing::{error, info_span};

use crate::config::DriveConfig;
use crate::controller::BehaviorController;
use crate::state::{Mode, RoverState};

/// Everything produced by one [`RoverLoop::tick`].
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub command: ActuatorCommand,
    pub mode: Mode,
    pub perception: PerceptionOutput,
    /// Set when the controller's command was replaced by a halt.
    pub rejected: Option<ProspectorError>,
}

pub struct RoverLoop {
    perception: PerceptionStep,
    map: WorldMap,
    controller: BehaviorController,
    verifier: CommandVerifier,
    state: RoverState,
}

impl RoverLoop {
    /// Build a loop for `width × height` camera frames.
    ///
    /// # Errors
    ///
    /// Any configuration or calibration error from either half of the
    /// pipeline.
    pub fn new(
        perception: PerceptionConfig,
        drive: DriveConfig,
        width: u32,
        height: u32,
    ) -> Result<Self, ProspectorError> {
        let perception = PerceptionStep::new(perception, width, height)?;
        let map = perception.new_world_map();
        let verifier = CommandVerifier::with_default_rules(drive.max_steer);
        let controller = BehaviorController::new(drive)?;
        let state = controller.new_state();
        Ok(Self {
            perception,
            map,
            controller,
            verifier,
            state,
        })
    }

    /// Replace the output verifier.
    pub fn with_verifier(mut self, verifier: CommandVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn state(&self) -> &RoverState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn map(&self) -> &WorldMap {
        &self.map
    }

    pub fn controller(&self) -> &BehaviorController {
        &self.controller
    }

    /// Run perception on `frame` taken at `telemetry.pose`.
    pub fn perceive(&mut self, frame: &RgbImage, telemetry: &Telemetry) -> PerceptionOutput {
        let _span = info_span!("perceive").entered();
        self.state.telemetry = *telemetry;
        let out = self.perception.run(frame, &telemetry.pose, &mut self.map);
        self.state.observations = Some(out.observations.clone());
        out
    }

    /// Decide and verify a command for `telemetry` at `now`.
    ///
    /// Returns the command to send and, when the controller's command was
    /// rejected, the rejection.
    pub fn decide(
        &mut self,
        telemetry: &Telemetry,
        now: Instant,
    ) -> (ActuatorCommand, Option<ProspectorError>) {
        let _span = info_span!("decide").entered();
        self.state.telemetry = *telemetry;
        let cmd = self.controller.step(&mut self.state, now);
        match self.verifier.verify(&cmd) {
            Ok(()) => (cmd, None),
            Err(e) => {
                error!(error = %e, ?cmd, mode = %self.state.mode, "command rejected, halting");
                let halt = ActuatorCommand::halt(self.controller.config().brake_set);
                self.state.command = halt;
                self.state.previous_steer = halt.steer;
                (halt, Some(e))
            }
        }
    }

    /// One full perceive-decide-verify cycle.
    pub fn tick(&mut self, frame: &RgbImage, telemetry: &Telemetry, now: Instant) -> TickOutput {
        let perception = self.perceive(frame, telemetry);
        let (command, rejected) = self.decide(telemetry, now);
        TickOutput {
            command,
            mode: self.state.mode,
            perception,
            rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use prospector_kernel::Rule;
    use prospector_perception::Channel;
    use prospector_types::Pose;

    const SAND: Rgb<u8> = Rgb([200, 190, 180]);
    const WALL: Rgb<u8> = Rgb([80, 60, 50]);

    fn rover() -> RoverLoop {
        RoverLoop::new(PerceptionConfig::default(), DriveConfig::default(), 320, 160).unwrap()
    }

    fn telemetry(vel: f32) -> Telemetry {
        Telemetry {
            pose: Pose::new(100.0, 100.0, 0.0),
            vel,
            near_sample: false,
            picking_up: false,
        }
    }

    #[test]
    fn open_sand_drives_forward() {
        let mut r = rover();
        let frame = RgbImage::from_pixel(320, 160, SAND);
        let out = r.tick(&frame, &telemetry(0.5), Instant::now());
        assert_eq!(out.mode, Mode::Forward);
        assert_eq!(out.command.throttle, 0.2);
        assert!(out.rejected.is_none());
        assert!(r.map().channel_count(Channel::Navigable) > 0);
    }

    #[test]
    fn wall_ahead_stops() {
        let mut r = rover();
        let frame = RgbImage::from_pixel(320, 160, WALL);
        let out = r.tick(&frame, &telemetry(1.0), Instant::now());
        assert_eq!(out.mode, Mode::Stop);
        assert_eq!(out.command.brake, 10.0);
        assert!(r.map().channel_count(Channel::Obstacle) > 0);
    }

    #[test]
    fn decide_before_perceive_uses_cruise_throttle() {
        let mut r = rover();
        let (cmd, rejected) = r.decide(&telemetry(0.0), Instant::now());
        assert_eq!(cmd.throttle, 0.2);
        assert!(rejected.is_none());
        assert!(r.state().observations.is_none());
    }

    struct NoThrottle;

    impl Rule for NoThrottle {
        fn name(&self) -> &str {
            "no_throttle"
        }

        fn check(&self, cmd: &ActuatorCommand) -> Result<(), ProspectorError> {
            if cmd.throttle != 0.0 {
                return Err(ProspectorError::CommandRejected {
                    rule: self.name().to_string(),
                    details: "throttle disabled".to_string(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn rejected_command_becomes_halt() {
        let mut verifier = CommandVerifier::new();
        verifier.add_rule(Box::new(NoThrottle));
        let mut r = rover().with_verifier(verifier);
        let frame = RgbImage::from_pixel(320, 160, SAND);
        let out = r.tick(&frame, &telemetry(0.5), Instant::now());
        assert_eq!(out.command, ActuatorCommand::halt(10.0));
        assert!(matches!(
            out.rejected,
            Some(ProspectorError::CommandRejected { .. })
        ));
        assert_eq!(r.state().command, ActuatorCommand::halt(10.0));
    }

    #[test]
    fn invalid_drive_config_rejected() {
        let drive = DriveConfig {
            max_steer: -1.0,
            ..DriveConfig::default()
        };
        assert!(RoverLoop::new(PerceptionConfig::default(), drive, 320, 160).is_err());
    }
}
