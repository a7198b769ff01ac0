//! Perception calibration and threshold parameters.
//!
//! Every field has a default tuned for the 320×160 simulator camera, so an
//! empty `[perception]` table is a valid configuration.

use prospector_types::ProspectorError;
use serde::{Deserialize, Serialize};

/// Largest accepted world map side, in cells.
pub const MAX_WORLD_SIZE: usize = 4096;

// ────────────────────────────────────────────────────────────────────────────
// RockBand
// ────────────────────────────────────────────────────────────────────────────

/// Colour window that identifies sample-rock pixels.
///
/// Bounds are inclusive. For [`RockBand::Hsv`] the hue is in degrees
/// `[0, 360)`; when `hue_deg[0] > hue_deg[1]` the window wraps through 0°.
/// Saturation and value use the `0..=255` scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "space", rename_all = "lowercase")]
pub enum RockBand {
    Hsv {
        hue_deg: [f32; 2],
        saturation: [u8; 2],
        value: [u8; 2],
    },
    Rgb {
        red: [u8; 2],
        green: [u8; 2],
        blue: [u8; 2],
    },
}

impl Default for RockBand {
    /// The golden-yellow signature of the simulator's sample rocks.
    fn default() -> Self {
        RockBand::Hsv {
            hue_deg: [32.0, 56.0],
            saturation: [82, 255],
            value: [126, 218],
        }
    }
}

impl RockBand {
    /// `true` when the pixel falls inside the window.
    pub fn contains(&self, rgb: [u8; 3]) -> bool {
        match self {
            RockBand::Rgb { red, green, blue } => {
                in_range(rgb[0], *red) && in_range(rgb[1], *green) && in_range(rgb[2], *blue)
            }
            RockBand::Hsv {
                hue_deg,
                saturation,
                value,
            } => {
                let (h, s, v) = rgb_to_hsv(rgb);
                if !in_range(s, *saturation) || !in_range(v, *value) {
                    return false;
                }
                let [lo, hi] = *hue_deg;
                if lo <= hi {
                    h >= lo && h <= hi
                } else {
                    h >= lo || h <= hi
                }
            }
        }
    }

    fn validate(&self) -> Result<(), ProspectorError> {
        let ordered = |field: &str, [lo, hi]: [u8; 2]| {
            if lo > hi {
                Err(ProspectorError::invalid_config(
                    format!("perception.rock_band.{field}"),
                    format!("lower bound {lo} exceeds upper bound {hi}"),
                ))
            } else {
                Ok(())
            }
        };
        match self {
            RockBand::Rgb { red, green, blue } => {
                ordered("red", *red)?;
                ordered("green", *green)?;
                ordered("blue", *blue)
            }
            RockBand::Hsv {
                hue_deg,
                saturation,
                value,
            } => {
                if hue_deg.iter().any(|h| !(0.0..=360.0).contains(h)) {
                    return Err(ProspectorError::invalid_config(
                        "perception.rock_band.hue_deg",
                        format!("hue bounds {hue_deg:?} must lie in [0, 360]"),
                    ));
                }
                ordered("saturation", *saturation)?;
                ordered("value", *value)
            }
        }
    }
}

fn in_range(v: u8, [lo, hi]: [u8; 2]) -> bool {
    v >= lo && v <= hi
}

/// Convert an RGB pixel to `(hue_deg, saturation, value)`.
///
/// Hue is in `[0, 360)`; saturation and value are on the `0..=255` scale.
/// Achromatic pixels report a hue of `0`.
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> (f32, u8, u8) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = f32::from(max - min);

    let s = if max == 0 {
        0
    } else {
        (255.0 * delta / f32::from(max)).round() as u8
    };

    if delta == 0.0 {
        return (0.0, s, max);
    }

    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    let h = if max as f32 == r {
        60.0 * ((g - b) / delta)
    } else if max as f32 == g {
        60.0 * ((b - r) / delta) + 120.0
    } else {
        60.0 * ((r - g) / delta) + 240.0
    };
    (h.rem_euclid(360.0), s, max)
}

// ────────────────────────────────────────────────────────────────────────────
// PerceptionConfig
// ────────────────────────────────────────────────────────────────────────────

/// Calibration and threshold parameters for the perception pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Four points in the camera frame (`[col, row]`) that outline a one
    /// grid-cell square on flat ground: bottom-left, bottom-right, top-right,
    /// top-left.
    pub source_points: [[f32; 2]; 4],
    /// Half the side length, in warped pixels, of the destination square.
    pub dst_size: f32,
    /// Distance in pixels between the bottom of the warped image and the
    /// destination square (the camera cannot see directly below the rover).
    pub bottom_offset: f32,
    /// A pixel is navigable when every channel is strictly above this bound.
    pub navigable_threshold: [u8; 3],
    pub rock_band: RockBand,
    /// Side length of the square world map, in cells.
    pub world_size: usize,
    /// Rover-centric pixels per world unit.
    pub scale: f32,
    /// Maximum pitch deviation from level (degrees) for map writes.
    pub pitch_tolerance_deg: f32,
    /// Maximum roll deviation from level (degrees) for map writes.
    pub roll_tolerance_deg: f32,
    /// Amount added to the navigable channel per observed pixel.
    pub navigable_weight: u32,
    /// Amount added to the obstacle channel per observed pixel.
    pub obstacle_weight: u32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            source_points: [[14.0, 140.0], [301.0, 140.0], [200.0, 96.0], [118.0, 96.0]],
            dst_size: 5.0,
            bottom_offset: 6.0,
            navigable_threshold: [160, 160, 160],
            rock_band: RockBand::default(),
            world_size: 200,
            scale: 10.0,
            pitch_tolerance_deg: 1.3,
            roll_tolerance_deg: 1.0,
            navigable_weight: 10,
            obstacle_weight: 1,
        }
    }
}

impl PerceptionConfig {
    /// Destination points for a frame of the given size, in the same corner
    /// order as [`PerceptionConfig::source_points`].
    pub fn destination_points(&self, width: u32, height: u32) -> [[f32; 2]; 4] {
        let cx = width as f32 / 2.0;
        let bottom = height as f32 - self.bottom_offset;
        let top = bottom - 2.0 * self.dst_size;
        [
            [cx - self.dst_size, bottom],
            [cx + self.dst_size, bottom],
            [cx + self.dst_size, top],
            [cx - self.dst_size, top],
        ]
    }

    /// Check the configuration for values that can never work.
    ///
    /// Degenerate calibration geometry is detected later, when the
    /// homography is solved.
    ///
    /// # Errors
    ///
    /// Returns [`ProspectorError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ProspectorError> {
        if !(1..=MAX_WORLD_SIZE).contains(&self.world_size) {
            return Err(ProspectorError::invalid_config(
                "perception.world_size",
                format!(
                    "must be between 1 and {MAX_WORLD_SIZE} cells, got {}",
                    self.world_size
                ),
            ));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(ProspectorError::invalid_config(
                "perception.scale",
                format!("must be a positive number, got {}", self.scale),
            ));
        }
        if !(self.dst_size.is_finite() && self.dst_size > 0.0) {
            return Err(ProspectorError::invalid_config(
                "perception.dst_size",
                format!("must be a positive number, got {}", self.dst_size),
            ));
        }
        if !self.bottom_offset.is_finite() {
            return Err(ProspectorError::invalid_config(
                "perception.bottom_offset",
                "must be finite",
            ));
        }
        if self.source_points.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ProspectorError::invalid_config(
                "perception.source_points",
                "all coordinates must be finite",
            ));
        }
        for (field, tol) in [
            ("perception.pitch_tolerance_deg", self.pitch_tolerance_deg),
            ("perception.roll_tolerance_deg", self.roll_tolerance_deg),
        ] {
            if !(tol.is_finite() && tol >= 0.0) {
                return Err(ProspectorError::invalid_config(
                    field,
                    format!("must be a non-negative number, got {tol}"),
                ));
            }
        }
        self.rock_band.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PerceptionConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_world_size_rejected() {
        let cfg = PerceptionConfig {
            world_size: 0,
            ..PerceptionConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("world_size"));
    }

    #[test]
    fn oversized_world_rejected() {
        let huge = PerceptionConfig {
            world_size: 1 << 33,
            ..PerceptionConfig::default()
        };
        let err = huge.validate().unwrap_err();
        assert!(matches!(err, ProspectorError::InvalidConfig { .. }));
        assert!(err.to_string().contains("world_size"));

        let just_over = PerceptionConfig {
            world_size: MAX_WORLD_SIZE + 1,
            ..PerceptionConfig::default()
        };
        assert!(just_over.validate().is_err());

        let at_cap = PerceptionConfig {
            world_size: MAX_WORLD_SIZE,
            ..PerceptionConfig::default()
        };
        assert!(at_cap.validate().is_ok());
    }

    #[test]
    fn non_positive_scale_rejected() {
        let cfg = PerceptionConfig {
            scale: 0.0,
            ..PerceptionConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_saturation_band_rejected() {
        let cfg = PerceptionConfig {
            rock_band: RockBand::Hsv {
                hue_deg: [30.0, 60.0],
                saturation: [200, 100],
                value: [0, 255],
            },
            ..PerceptionConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("saturation"));
    }

    #[test]
    fn destination_points_for_simulator_frame() {
        let pts = PerceptionConfig::default().destination_points(320, 160);
        assert_eq!(pts[0], [155.0, 154.0]);
        assert_eq!(pts[1], [165.0, 154.0]);
        assert_eq!(pts[2], [165.0, 144.0]);
        assert_eq!(pts[3], [155.0, 144.0]);
    }

    #[test]
    fn hsv_of_primaries() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), (0.0, 255, 255));
        let (h, _, _) = rgb_to_hsv([0, 255, 0]);
        assert!((h - 120.0).abs() < 1e-3);
        let (h, _, _) = rgb_to_hsv([0, 0, 255]);
        assert!((h - 240.0).abs() < 1e-3);
        assert_eq!(rgb_to_hsv([0, 0, 0]), (0.0, 0, 0));
    }

    #[test]
    fn default_band_matches_sample_rock_gold() {
        let band = RockBand::default();
        // Typical rock pixel from the simulator.
        assert!(band.contains([160, 130, 10]));
        // Sand and sky.
        assert!(!band.contains([200, 180, 160]));
        assert!(!band.contains([90, 120, 200]));
        assert!(!band.contains([0, 0, 0]));
    }

    #[test]
    fn hue_window_can_wrap() {
        let band = RockBand::Hsv {
            hue_deg: [340.0, 20.0],
            saturation: [50, 255],
            value: [50, 255],
        };
        assert!(band.contains([200, 20, 20]));
        assert!(band.contains([200, 20, 60]));
        assert!(!band.contains([20, 200, 20]));
    }

    #[test]
    fn rgb_band_is_inclusive() {
        let band = RockBand::Rgb {
            red: [100, 200],
            green: [100, 200],
            blue: [0, 50],
        };
        assert!(band.contains([100, 200, 50]));
        assert!(!band.contains([99, 150, 20]));
    }

    #[test]
    fn config_deserializes_from_partial_toml() {
        let cfg: PerceptionConfig = toml::from_str(
            r#"
            world_size = 100
            [rock_band]
            space = "rgb"
            red = [110, 255]
            green = [110, 255]
            blue = [0, 50]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.world_size, 100);
        assert_eq!(cfg.scale, 10.0);
        assert!(matches!(cfg.rock_band, RockBand::Rgb { .. }));
    }
}
