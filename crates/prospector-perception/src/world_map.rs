//! Accumulating world map.
//!
//! A square grid of `size × size` cells with one `u32` counter per
//! [`Channel`]. Terrain observations accumulate with saturating adds, so a
//! cell that has been seen as sand many times outweighs a single spurious
//! obstacle reading. The rock channel is written with [`ROCK_FOUND`] when a
//! sample is localised. The map is allocated once and never reset.
//!
//! # Example
//!
//! ```rust
//! use prospector_perception::projection::GridCell;
//! use prospector_perception::world_map::{Channel, WorldMap, ROCK_FOUND};
//!
//! let mut map = WorldMap::new(200, 10, 1);
//! let cell = GridCell { x: 3, y: 4 };
//! map.record_terrain(&[cell, cell], Channel::Navigable);
//! map.record_rock(cell);
//!
//! assert_eq!(map.cell(3, 4), Some([0, ROCK_FOUND, 20]));
//! ```

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::config::PerceptionConfig;
use crate::projection::GridCell;

/// Value written to the rock channel where a sample was localised.
pub const ROCK_FOUND: u32 = 255;

/// Map layer index. The order matches the RGB layout of
/// [`WorldMap::to_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Obstacle = 0,
    Rock = 1,
    Navigable = 2,
}

impl Channel {
    fn index(self) -> usize {
        self as usize
    }
}

/// `true` when `angle_deg` (wrapping in `[0, 360)`) is within `tolerance_deg`
/// of level.
pub fn near_level(angle_deg: f32, tolerance_deg: f32) -> bool {
    angle_deg < tolerance_deg || angle_deg > 360.0 - tolerance_deg
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldMap {
    size: usize,
    cells: Vec<[u32; 3]>,
    navigable_weight: u32,
    obstacle_weight: u32,
}

impl WorldMap {
    /// An empty `size × size` map with the given per-pixel channel weights.
    pub fn new(size: usize, navigable_weight: u32, obstacle_weight: u32) -> Self {
        Self {
            size,
            cells: vec![[0; 3]; size * size],
            navigable_weight,
            obstacle_weight,
        }
    }

    /// An empty map sized and weighted from `config`.
    pub fn from_config(config: &PerceptionConfig) -> Self {
        Self::new(
            config.world_size,
            config.navigable_weight,
            config.obstacle_weight,
        )
    }

    /// Add the channel's weight once per entry in `cells`. Duplicates each
    /// contribute. Recording into [`Channel::Rock`] is a no-op; use
    /// [`WorldMap::record_rock`].
    pub fn record_terrain(&mut self, cells: &[GridCell], channel: Channel) {
        let weight = match channel {
            Channel::Navigable => self.navigable_weight,
            Channel::Obstacle => self.obstacle_weight,
            Channel::Rock => return,
        };
        for cell in cells {
            if let Some(i) = self.index(cell.x, cell.y) {
                let slot = &mut self.cells[i][channel.index()];
                *slot = slot.saturating_add(weight);
            }
        }
    }

    /// Mark a localised sample.
    pub fn record_rock(&mut self, cell: GridCell) {
        if let Some(i) = self.index(cell.x, cell.y) {
            self.cells[i][Channel::Rock.index()] = ROCK_FOUND;
        }
    }

    /// `[obstacle, rock, navigable]` at `(x, y)`, or `None` off the map.
    pub fn cell(&self, x: usize, y: usize) -> Option<[u32; 3]> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Number of cells with a non-zero value in `channel`.
    pub fn channel_count(&self, channel: Channel) -> usize {
        self.cells
            .iter()
            .filter(|c| c[channel.index()] > 0)
            .count()
    }

    /// Render the map with R = obstacle, G = rock, B = navigable, each
    /// saturating at 255. Row 0 of the image is the top of the map (largest
    /// `y`), so the picture reads with the y axis pointing up.
    pub fn to_image(&self) -> RgbImage {
        let side = self.size as u32;
        let top = self.size.saturating_sub(1);
        RgbImage::from_fn(side, side, |col, row| {
            let c = self.cells[(top - row as usize) * self.size + col as usize];
            Rgb(c.map(|v| v.min(255) as u8))
        })
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.size && y < self.size).then(|| y * self.size + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terrain_accumulates_with_weights() {
        let mut map = WorldMap::new(10, 10, 1);
        let a = GridCell { x: 1, y: 2 };
        map.record_terrain(&[a, a, a], Channel::Obstacle);
        map.record_terrain(&[a], Channel::Navigable);
        assert_eq!(map.cell(1, 2), Some([3, 0, 10]));
        assert_eq!(map.channel_count(Channel::Obstacle), 1);
        assert_eq!(map.channel_count(Channel::Rock), 0);
    }

    #[test]
    fn counters_saturate() {
        let mut map = WorldMap::new(2, u32::MAX, 1);
        let a = GridCell { x: 0, y: 0 };
        map.record_terrain(&[a, a], Channel::Navigable);
        assert_eq!(map.cell(0, 0), Some([0, 0, u32::MAX]));
    }

    #[test]
    fn rock_is_overwritten_not_accumulated() {
        let mut map = WorldMap::new(5, 10, 1);
        let a = GridCell { x: 4, y: 4 };
        map.record_rock(a);
        map.record_rock(a);
        map.record_terrain(&[a], Channel::Rock);
        assert_eq!(map.cell(4, 4), Some([0, ROCK_FOUND, 0]));
    }

    #[test]
    fn out_of_range_access() {
        let mut map = WorldMap::new(3, 10, 1);
        map.record_rock(GridCell { x: 3, y: 0 });
        assert_eq!(map.cell(3, 0), None);
        assert_eq!(map.channel_count(Channel::Rock), 0);
    }

    #[test]
    fn image_has_y_axis_up() {
        let mut map = WorldMap::new(4, 10, 1);
        map.record_terrain(&[GridCell { x: 1, y: 3 }], Channel::Navigable);
        map.record_rock(GridCell { x: 0, y: 0 });
        let img = map.to_image();
        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 10]);
        assert_eq!(img.get_pixel(0, 3).0, [0, 255, 0]);
    }

    #[test]
    fn level_gate_wraps_through_360() {
        assert!(near_level(0.5, 1.0));
        assert!(near_level(359.5, 1.0));
        assert!(!near_level(1.0, 1.0));
        assert!(!near_level(5.0, 1.3));
        assert!(!near_level(350.0, 1.3));
    }
}
