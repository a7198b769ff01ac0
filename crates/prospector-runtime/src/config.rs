//! [`DriveConfig`] – thresholds and set-points for the behaviour controller.
//!
//! All fields have defaults, so an empty `[drive]` table is valid. Durations
//! are stored as seconds so the table stays readable in TOML.

use std::time::Duration;

use prospector_types::ProspectorError;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Supporting types
// ─────────────────────────────────────────────────────────────────────────────

/// Mode entered when an approached sample drops out of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    #[default]
    Forward,
    Stop,
}

/// Visibility-dependent override of the cruise set-points.
///
/// The band with the largest `min_nav_pixels` not exceeding the current
/// navigable pixel count is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedBand {
    pub min_nav_pixels: usize,
    pub throttle_set: f32,
    pub max_vel: f32,
    pub brake_set: f32,
}

/// Cruise set-points in effect for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveParams {
    pub throttle_set: f32,
    pub max_vel: f32,
    pub brake_set: f32,
}

// ─────────────────────────────────────────────────────────────────────────────
// DriveConfig
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Below this many navigable pixels, forward driving stops.
    pub stop_forward: usize,
    /// A stopped rover needs this many navigable pixels to drive off.
    pub go_forward: usize,
    pub throttle_set: f32,
    pub max_vel: f32,
    pub brake_set: f32,
    pub speed_bands: Vec<SpeedBand>,
    /// Steering range in degrees, symmetric about zero.
    pub max_steer: f32,
    /// Maximum change of the steering command per tick (degrees).
    pub steer_rate_limit: f32,
    /// Speeds at or below this count as stopped.
    pub stopped_epsilon: f32,
    /// While in `Stop` with `|steer|` at or below this, the rover is stably
    /// stopped and exempt from stuck detection.
    pub stopped_steer_tolerance: f32,
    pub stuck_timeout_secs: f64,
    /// Minimum displacement (world units) per stuck window.
    pub stuck_min_displacement: f32,
    pub reverse_duration_secs: f64,
    pub reverse_throttle: f32,
    /// Leave reverse early once this far from where it started.
    pub reverse_clear_distance: Option<f32>,
    /// Rock pixel count above which a sample is considered detected.
    pub sample_min_pixels: usize,
    /// Half-width of the forward cone checked for obstacles (degrees).
    pub blocked_cone_deg: f32,
    pub blocked_min_dist: f32,
    pub blocked_max_dist: f32,
    /// Obstacle pixel count inside the cone above which the path is blocked.
    pub blocked_min_pixels: usize,
    pub approach_throttle: f32,
    pub approach_max_vel: f32,
    pub approach_brake: f32,
    /// Stop and turn in place when the sample bearing exceeds this (degrees).
    pub approach_align_tolerance: Option<f32>,
    pub approach_fallback: FallbackMode,
    pub near_sample_brake: f32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            stop_forward: 50,
            go_forward: 500,
            throttle_set: 0.2,
            max_vel: 2.0,
            brake_set: 10.0,
            speed_bands: Vec::new(),
            max_steer: 15.0,
            steer_rate_limit: 5.0,
            stopped_epsilon: 0.2,
            stopped_steer_tolerance: 2.0,
            stuck_timeout_secs: 15.0,
            stuck_min_displacement: 15.0,
            reverse_duration_secs: 3.0,
            reverse_throttle: -1.0,
            reverse_clear_distance: None,
            sample_min_pixels: 7,
            blocked_cone_deg: 10.0,
            blocked_min_dist: 8.0,
            blocked_max_dist: 30.0,
            blocked_min_pixels: 50,
            approach_throttle: 0.3,
            approach_max_vel: 0.8,
            approach_brake: 0.5,
            approach_align_tolerance: None,
            approach_fallback: FallbackMode::Forward,
            near_sample_brake: 100.0,
        }
    }
}

impl DriveConfig {
    pub fn stuck_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.stuck_timeout_secs).unwrap_or_default()
    }

    pub fn reverse_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.reverse_duration_secs).unwrap_or_default()
    }

    /// Set-points for a tick that sees `nav_pixels` navigable pixels.
    pub fn params_for(&self, nav_pixels: usize) -> DriveParams {
        let base = DriveParams {
            throttle_set: self.throttle_set,
            max_vel: self.max_vel,
            brake_set: self.brake_set,
        };
        self.speed_bands
            .iter()
            .filter(|b| b.min_nav_pixels <= nav_pixels)
            .max_by_key(|b| b.min_nav_pixels)
            .map_or(base, |b| DriveParams {
                throttle_set: b.throttle_set,
                max_vel: b.max_vel,
                brake_set: b.brake_set,
            })
    }

    /// Reject values that would make the controller emit commands outside
    /// the actuator ranges, or never terminate a mode.
    ///
    /// # Errors
    ///
    /// [`ProspectorError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ProspectorError> {
        let throttles = [
            ("drive.throttle_set", self.throttle_set),
            ("drive.reverse_throttle", self.reverse_throttle),
            ("drive.approach_throttle", self.approach_throttle),
        ];
        for (field, v) in throttles {
            check_range(field, v, -1.0, 1.0)?;
        }

        let non_negative = [
            ("drive.max_vel", self.max_vel),
            ("drive.brake_set", self.brake_set),
            ("drive.stopped_epsilon", self.stopped_epsilon),
            ("drive.stopped_steer_tolerance", self.stopped_steer_tolerance),
            ("drive.stuck_min_displacement", self.stuck_min_displacement),
            ("drive.blocked_cone_deg", self.blocked_cone_deg),
            ("drive.blocked_min_dist", self.blocked_min_dist),
            ("drive.blocked_max_dist", self.blocked_max_dist),
            ("drive.approach_max_vel", self.approach_max_vel),
            ("drive.approach_brake", self.approach_brake),
            ("drive.near_sample_brake", self.near_sample_brake),
        ];
        for (field, v) in non_negative {
            check_range(field, v, 0.0, f32::MAX)?;
        }

        check_range("drive.max_steer", self.max_steer, f32::MIN_POSITIVE, 90.0)?;
        check_range(
            "drive.steer_rate_limit",
            self.steer_rate_limit,
            f32::MIN_POSITIVE,
            f32::MAX,
        )?;

        for (field, secs) in [
            ("drive.stuck_timeout_secs", self.stuck_timeout_secs),
            ("drive.reverse_duration_secs", self.reverse_duration_secs),
        ] {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(ProspectorError::invalid_config(
                    field,
                    format!("must be a non-negative number of seconds, got {secs}"),
                ));
            }
        }

        if let Some(d) = self.reverse_clear_distance {
            check_range("drive.reverse_clear_distance", d, f32::MIN_POSITIVE, f32::MAX)?;
        }
        if let Some(t) = self.approach_align_tolerance {
            check_range("drive.approach_align_tolerance", t, 0.0, self.max_steer.max(90.0))?;
        }

        if self.blocked_min_dist >= self.blocked_max_dist {
            return Err(ProspectorError::invalid_config(
                "drive.blocked_min_dist",
                format!(
                    "{} must be below blocked_max_dist {}",
                    self.blocked_min_dist, self.blocked_max_dist
                ),
            ));
        }

        for (i, band) in self.speed_bands.iter().enumerate() {
            check_range(
                &format!("drive.speed_bands[{i}].throttle_set"),
                band.throttle_set,
                -1.0,
                1.0,
            )?;
            check_range(
                &format!("drive.speed_bands[{i}].max_vel"),
                band.max_vel,
                0.0,
                f32::MAX,
            )?;
            check_range(
                &format!("drive.speed_bands[{i}].brake_set"),
                band.brake_set,
                0.0,
                f32::MAX,
            )?;
        }
        Ok(())
    }
}

fn check_range(field: &str, v: f32, min: f32, max: f32) -> Result<(), ProspectorError> {
    if v.is_finite() && v >= min && v <= max {
        Ok(())
    } else {
        Err(ProspectorError::invalid_config(
            field,
            format!("{v} is outside [{min}, {max}]"),
        ))
    }
}
