//! Coordinate projection: warped-image pixels → rover frame → world grid.
//!
//! The rover frame has its origin at the bottom-centre of the warped image,
//! `x` pointing forward (rows above the bottom edge) and `y` pointing left
//! (columns left of centre). One rover-frame unit is one warped pixel; one
//! world unit is `scale` warped pixels.
//!
//! # Example
//!
//! ```rust
//! use prospector_perception::projection::CoordinateProjector;
//! use prospector_types::Pose;
//!
//! let projector = CoordinateProjector::new(200, 10.0);
//! let pose = Pose::new(100.0, 50.0, 90.0);
//!
//! // 20 px straight ahead of a rover facing +Y is two cells north of it.
//! let cell = projector.world_cell(20.0, 0.0, &pose);
//! assert_eq!((cell.x, cell.y), (100, 52));
//! ```

use prospector_types::{Pose, PolarObservations};

use crate::mask::Mask;

/// Integer world-map cell, always inside the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub x: usize,
    pub y: usize,
}

/// Rover-centric Cartesian coordinates of a set of pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoverPoints {
    pub xs: Vec<f32>,
    pub ys: Vec<f32>,
}

impl RoverPoints {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.xs.iter().copied().zip(self.ys.iter().copied())
    }
}

/// Projects rover-centric points into a square world grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateProjector {
    world_size: usize,
    scale: f32,
}

impl CoordinateProjector {
    /// Projector for a `world_size × world_size` grid at `scale` pixels per cell.
    pub fn new(world_size: usize, scale: f32) -> Self {
        Self { world_size, scale }
    }

    /// Rover-centric coordinates of every set pixel in `mask`.
    ///
    /// A pixel in image row `r` and column `c` maps to
    /// `x = height − r`, `y = width/2 − c`. Since `r < height`, `x ≥ 1` and
    /// the rover's own position is never produced.
    pub fn rover_coords(mask: &Mask) -> RoverPoints {
        let height = mask.height() as f32;
        let half_width = mask.width() as f32 / 2.0;
        let mut points = RoverPoints::default();
        for (col, row) in mask.set_pixels() {
            points.xs.push(height - row as f32);
            points.ys.push(half_width - col as f32);
        }
        points
    }

    /// Polar form of rover-centric points: `(sqrt(x²+y²), atan2(y, x))`.
    pub fn to_polar(points: &RoverPoints) -> PolarObservations {
        let (dists, angles) = points
            .iter()
            .map(|(x, y)| ((x * x + y * y).sqrt(), y.atan2(x)))
            .unzip();
        PolarObservations::new(dists, angles)
    }

    /// Continuous world position of a rover-centric point (no clamping).
    pub fn rover_to_world(&self, x: f32, y: f32, pose: &Pose) -> (f32, f32) {
        let (sin, cos) = pose.yaw.to_radians().sin_cos();
        let x_rot = x * cos - y * sin;
        let y_rot = x * sin + y * cos;
        (x_rot / self.scale + pose.x, y_rot / self.scale + pose.y)
    }

    /// Inverse of [`CoordinateProjector::rover_to_world`].
    pub fn world_to_rover(&self, world_x: f32, world_y: f32, pose: &Pose) -> (f32, f32) {
        let dx = (world_x - pose.x) * self.scale;
        let dy = (world_y - pose.y) * self.scale;
        let (sin, cos) = pose.yaw.to_radians().sin_cos();
        (dx * cos + dy * sin, -dx * sin + dy * cos)
    }

    /// World cell of a rover-centric point.
    ///
    /// Coordinates are truncated toward zero and each axis is clamped to
    /// `[0, world_size − 1]` independently, so off-map detections land on
    /// the map boundary.
    pub fn world_cell(&self, x: f32, y: f32, pose: &Pose) -> GridCell {
        let (wx, wy) = self.rover_to_world(x, y, pose);
        GridCell {
            x: self.clamp_axis(wx),
            y: self.clamp_axis(wy),
        }
    }

    /// World cells of every point, in input order.
    pub fn to_world(&self, points: &RoverPoints, pose: &Pose) -> Vec<GridCell> {
        points
            .iter()
            .map(|(x, y)| self.world_cell(x, y, pose))
            .collect()
    }

    fn clamp_axis(&self, v: f32) -> usize {
        let max = self.world_size.saturating_sub(1) as i64;
        // `as` saturates on overflow and maps NaN to 0.
        (v as i64).clamp(0, max) as usize
    }
}
