//! [`BehaviorController`] – the rover's mode state machine.
//!
//! Each call to [`BehaviorController::step`] runs one decision tick:
//!
//! 1. **Guards** – no vision yet, pickup in progress, pickup request, and
//!    braking next to a sample short-circuit the tick.
//! 2. **Arbitrate** – a visible sample wins over a blocked path, which wins
//!    over stuck detection. The winner sets the [`Mode`].
//! 3. **Dispatch** – the handler for the active mode produces throttle,
//!    brake and a steering target.
//! 4. **Smooth** – the steering target is rate limited against the previous
//!    tick's steering.
//!
//! Every time-dependent decision takes `now` from the caller, so replays and
//! tests run on a synthetic clock.

use std::time::Instant;

use prospector_types::{ActuatorCommand, FrameObservations, ProspectorError};
use tracing::{debug, info, warn};

use crate::config::{DriveConfig, DriveParams, FallbackMode};
use crate::state::{Mode, RoverState, TurnDirection};
use crate::steering::SteeringLimiter;

// ─────────────────────────────────────────────────────────────────────────────
// Scene summary
// ─────────────────────────────────────────────────────────────────────────────

/// The handful of numbers the state machine needs from one frame's
/// observations.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Scene {
    nav_count: usize,
    nav_mean_deg: Option<f32>,
    /// Navigable pixels at or left of straight ahead.
    nav_left: usize,
    rock_count: usize,
    rock_mean_deg: Option<f32>,
    blocked: bool,
}

impl Scene {
    fn of(obs: &FrameObservations, config: &DriveConfig) -> Self {
        let nav_left = obs.navigable.angles.iter().filter(|a| **a >= 0.0).count();
        let in_cone = obs
            .obstacles
            .iter()
            .filter(|&(dist, angle)| {
                angle.to_degrees().abs() <= config.blocked_cone_deg
                    && dist > config.blocked_min_dist
                    && dist < config.blocked_max_dist
            })
            .count();
        Self {
            nav_count: obs.navigable.len(),
            nav_mean_deg: obs.navigable.mean_angle_deg(),
            nav_left,
            rock_count: obs.rocks.len(),
            rock_mean_deg: obs.rocks.mean_angle_deg(),
            blocked: in_cone > config.blocked_min_pixels,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BehaviorController
// ─────────────────────────────────────────────────────────────────────────────

/// Stateless decision logic over a caller-owned [`RoverState`].
#[derive(Debug, Clone)]
pub struct BehaviorController {
    config: DriveConfig,
    steering: SteeringLimiter,
}

impl BehaviorController {
    /// # Errors
    ///
    /// [`ProspectorError::InvalidConfig`] when `config` fails validation.
    pub fn new(config: DriveConfig) -> Result<Self, ProspectorError> {
        config.validate()?;
        let steering = SteeringLimiter::new(config.max_steer, config.steer_rate_limit);
        Ok(Self { config, steering })
    }

    /// The validated drive configuration.
    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// A fresh state matching this controller's configuration.
    pub fn new_state(&self) -> RoverState {
        RoverState::new(&self.config)
    }

    /// Run one decision tick, recording the emitted command in `state`.
    pub fn step(&self, state: &mut RoverState, now: Instant) -> ActuatorCommand {
        let cmd = self.decide(state, now);
        state.previous_steer = cmd.steer;
        state.command = cmd;
        debug!(
            mode = %state.mode,
            throttle = cmd.throttle,
            brake = cmd.brake,
            steer = cmd.steer,
            send_pickup = cmd.send_pickup,
            "decision tick"
        );
        cmd
    }

    fn decide(&self, state: &mut RoverState, now: Instant) -> ActuatorCommand {
        let cfg = &self.config;
        let Some(obs) = state.observations.as_ref() else {
            return ActuatorCommand {
                throttle: cfg.throttle_set,
                ..ActuatorCommand::idle()
            };
        };
        let scene = Scene::of(obs, cfg);
        let telemetry = state.telemetry;

        if telemetry.picking_up {
            return ActuatorCommand::idle();
        }
        if telemetry.near_sample && telemetry.vel == 0.0 {
            info!(x = telemetry.pose.x, y = telemetry.pose.y, "requesting sample pickup");
            set_mode(state, Mode::Stop);
            return ActuatorCommand {
                send_pickup: true,
                ..ActuatorCommand::idle()
            };
        }
        if telemetry.near_sample {
            return ActuatorCommand::halt(cfg.near_sample_brake);
        }

        self.arbitrate(state, &scene, now);

        let params = cfg.params_for(scene.nav_count);
        let target = match state.mode {
            Mode::Forward => self.forward(state, &scene, &params),
            Mode::Stop => self.stop(state, &scene, &params),
            Mode::Reverse { since } => self.reverse(state, &params, since, now),
            Mode::ApproachSample => self.approach(state, &scene, &params),
        };

        ActuatorCommand {
            steer: self.steering.smooth(target.steer, state.previous_steer),
            ..target
        }
    }

    /// Sample, then blocked path, then stuck.
    fn arbitrate(&self, state: &mut RoverState, scene: &Scene, now: Instant) {
        let cfg = &self.config;
        let pose = state.telemetry.pose;
        if scene.rock_count > cfg.sample_min_pixels {
            set_mode(state, Mode::ApproachSample);
        } else if scene.blocked {
            set_mode(state, Mode::Stop);
        } else if self.stably_stopped(state) {
            // Standing still on purpose; start a fresh window for when we move.
            state.stuck.reanchor(now, &pose);
        } else if state.stuck.check(now, &pose) {
            warn!(x = pose.x, y = pose.y, mode = %state.mode, "rover stuck, reversing");
            set_mode(state, Mode::Reverse { since: now });
            state.reverse_origin = Some(pose);
        }
    }

    fn stably_stopped(&self, state: &RoverState) -> bool {
        state.mode == Mode::Stop
            && state.previous_steer.abs() <= self.config.stopped_steer_tolerance
    }

    // ── Mode handlers ────────────────────────────────────────────────────────

    fn forward(&self, state: &mut RoverState, scene: &Scene, params: &DriveParams) -> ActuatorCommand {
        if scene.nav_count >= self.config.stop_forward {
            let throttle = if state.telemetry.vel < params.max_vel {
                params.throttle_set
            } else {
                0.0
            };
            ActuatorCommand {
                throttle,
                steer: self.bearing(scene.nav_mean_deg),
                ..ActuatorCommand::idle()
            }
        } else {
            set_mode(state, Mode::Stop);
            ActuatorCommand::halt(params.brake_set)
        }
    }

    fn stop(&self, state: &mut RoverState, scene: &Scene, params: &DriveParams) -> ActuatorCommand {
        if state.telemetry.vel > self.config.stopped_epsilon {
            return ActuatorCommand::halt(params.brake_set);
        }
        if scene.nav_count < self.config.go_forward || scene.blocked {
            let direction = *state.turn_commitment.get_or_insert_with(|| {
                if scene.nav_left > scene.nav_count - scene.nav_left {
                    TurnDirection::Left
                } else {
                    TurnDirection::Right
                }
            });
            return ActuatorCommand {
                steer: direction.steer(self.config.max_steer),
                ..ActuatorCommand::idle()
            };
        }
        set_mode(state, Mode::Forward);
        ActuatorCommand {
            throttle: params.throttle_set,
            steer: self.bearing(scene.nav_mean_deg),
            ..ActuatorCommand::idle()
        }
    }

    fn reverse(
        &self,
        state: &mut RoverState,
        params: &DriveParams,
        since: Instant,
        now: Instant,
    ) -> ActuatorCommand {
        let cfg = &self.config;
        let pose = state.telemetry.pose;
        let timed_out = now.saturating_duration_since(since) > cfg.reverse_duration();
        let cleared = match (cfg.reverse_clear_distance, state.reverse_origin) {
            (Some(limit), Some(origin)) => origin.distance_to(&pose) > limit,
            _ => false,
        };
        if timed_out || cleared {
            set_mode(state, Mode::Forward);
            state.stuck.reanchor(now, &pose);
            return ActuatorCommand {
                throttle: params.throttle_set,
                ..ActuatorCommand::idle()
            };
        }
        ActuatorCommand {
            throttle: cfg.reverse_throttle,
            ..ActuatorCommand::idle()
        }
    }

    fn approach(&self, state: &mut RoverState, scene: &Scene, params: &DriveParams) -> ActuatorCommand {
        let cfg = &self.config;
        let Some(bearing) = scene.rock_mean_deg else {
            // Lost sight of the sample: hand over within this tick.
            return match cfg.approach_fallback {
                FallbackMode::Forward => {
                    set_mode(state, Mode::Forward);
                    self.forward(state, scene, params)
                }
                FallbackMode::Stop => {
                    set_mode(state, Mode::Stop);
                    self.stop(state, scene, params)
                }
            };
        };
        let vel = state.telemetry.vel;

        if let Some(tolerance) = cfg.approach_align_tolerance
            && bearing.abs() > tolerance
        {
            if vel > cfg.stopped_epsilon {
                return ActuatorCommand {
                    steer: self.bearing(Some(bearing)),
                    ..ActuatorCommand::halt(params.brake_set)
                };
            }
            return ActuatorCommand {
                steer: cfg.max_steer.copysign(bearing),
                ..ActuatorCommand::idle()
            };
        }

        let steer = self.bearing(Some(bearing));
        if vel > cfg.approach_max_vel {
            ActuatorCommand {
                steer,
                ..ActuatorCommand::halt(cfg.approach_brake)
            }
        } else {
            ActuatorCommand {
                throttle: cfg.approach_throttle,
                steer,
                ..ActuatorCommand::idle()
            }
        }
    }

    /// Clamped steering toward a mean bearing; straight ahead when unknown.
    fn bearing(&self, mean_deg: Option<f32>) -> f32 {
        mean_deg.map_or(0.0, |m| self.steering.clamp(m))
    }
}

fn set_mode(state: &mut RoverState, next: Mode) {
    if !state.mode.same_kind(&next) {
        info!(from = %state.mode, to = %next, "mode transition");
        if state.mode == Mode::Stop {
            state.turn_commitment = None;
        }
        if matches!(state.mode, Mode::Reverse { .. }) {
            state.reverse_origin = None;
        }
    }
    state.mode = next;
}
