//! `prospector-perception` – camera frames to terrain observations.
//!
//! Converts a single forward-facing camera frame plus the rover pose into
//! rover-centric polar observations and an accumulating world map.
//!
//! # Modules
//!
//! - [`homography`] – [`Homography`][homography::Homography]: planar
//!   perspective transform solved from four point correspondences, with an
//!   inverse-mapped bilinear warp.
//! - [`mask`] – [`Mask`][mask::Mask]: row-major binary raster.
//! - [`classify`] – [`ImageClassifier`][classify::ImageClassifier]: warps a
//!   frame to a top-down view and thresholds it into navigable, obstacle and
//!   rock masks.
//! - [`projection`] – [`CoordinateProjector`][projection::CoordinateProjector]:
//!   mask pixels to rover-centric Cartesian and polar coordinates, and rover
//!   coordinates to clamped world cells.
//! - [`world_map`] – [`WorldMap`][world_map::WorldMap]: three-channel
//!   accumulating grid, gated on the rover being level.
//! - [`pipeline`] – [`PerceptionStep`][pipeline::PerceptionStep]: one full
//!   perception pass per frame.
//! - [`config`] – [`PerceptionConfig`][config::PerceptionConfig]: calibration
//!   and thresholds.

pub mod classify;
pub mod config;
pub mod homography;
pub mod mask;
pub mod pipeline;
pub mod projection;
pub mod world_map;

pub use classify::{ClassifiedMasks, ImageClassifier};
pub use config::{PerceptionConfig, RockBand};
pub use pipeline::{ObservationSummary, PerceptionOutput, PerceptionStep};
pub use projection::{CoordinateProjector, GridCell};
pub use world_map::{Channel, ROCK_FOUND, WorldMap};
