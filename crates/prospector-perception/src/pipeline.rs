//! One perception pass: classify, project, update the map.
//!
//! [`PerceptionStep::run`] is called once per camera frame. It never fails:
//! frames of an unexpected size cause the homography to be re-planned, and a
//! re-plan that fails yields empty observations for that frame.

use image::{Rgb, RgbImage};
use prospector_types::{FrameObservations, Pose, ProspectorError};
use serde::Serialize;
use tracing::{debug, warn};

use crate::classify::{ClassifiedMasks, ImageClassifier};
use crate::config::PerceptionConfig;
use crate::projection::{CoordinateProjector, RoverPoints};
use crate::world_map::{Channel, WorldMap, near_level};

/// Result of one perception pass.
#[derive(Debug, Clone)]
pub struct PerceptionOutput {
    pub observations: FrameObservations,
    /// Warped view with R = obstacle, G = rock, B = navigable.
    pub vision: RgbImage,
    /// `false` when the level gate suppressed the map update.
    pub map_updated: bool,
}

/// Per-mask pixel counts and mean angles, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObservationSummary {
    pub navigable_pixels: usize,
    pub obstacle_pixels: usize,
    pub rock_pixels: usize,
    pub navigable_mean_deg: Option<f32>,
    pub rock_mean_deg: Option<f32>,
}

impl ObservationSummary {
    pub fn of(obs: &FrameObservations) -> Self {
        Self {
            navigable_pixels: obs.navigable.len(),
            obstacle_pixels: obs.obstacles.len(),
            rock_pixels: obs.rocks.len(),
            navigable_mean_deg: obs.navigable.mean_angle_deg(),
            rock_mean_deg: obs.rocks.mean_angle_deg(),
        }
    }
}

pub struct PerceptionStep {
    config: PerceptionConfig,
    classifier: Option<ImageClassifier>,
    projector: CoordinateProjector,
}

impl PerceptionStep {
    /// Validate `config` and plan the warp for `width × height` frames.
    ///
    /// # Errors
    ///
    /// [`ProspectorError::InvalidConfig`] for out-of-range parameters and
    /// [`ProspectorError::InvalidCalibration`] for degenerate source points.
    pub fn new(config: PerceptionConfig, width: u32, height: u32) -> Result<Self, ProspectorError> {
        config.validate()?;
        let classifier = ImageClassifier::new(&config, width, height)?;
        let projector = CoordinateProjector::new(config.world_size, config.scale);
        Ok(Self {
            config,
            classifier: Some(classifier),
            projector,
        })
    }

    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    /// A fresh map sized and weighted for this pipeline.
    pub fn new_world_map(&self) -> WorldMap {
        WorldMap::from_config(&self.config)
    }

    /// Process one frame taken at `pose`, updating `map` when the rover is
    /// level.
    pub fn run(&mut self, frame: &RgbImage, pose: &Pose, map: &mut WorldMap) -> PerceptionOutput {
        let Some(classifier) = self.classifier_for(frame.width(), frame.height()) else {
            return PerceptionOutput {
                observations: FrameObservations::default(),
                vision: RgbImage::new(frame.width(), frame.height()),
                map_updated: false,
            };
        };
        let masks = classifier.classify(frame);
        let vision = vision_raster(&masks);

        let nav_pts = CoordinateProjector::rover_coords(&masks.navigable);
        let obs_pts = CoordinateProjector::rover_coords(&masks.obstacle);
        let rock_pts = CoordinateProjector::rover_coords(&masks.rock);

        let observations = FrameObservations {
            navigable: CoordinateProjector::to_polar(&nav_pts),
            obstacles: CoordinateProjector::to_polar(&obs_pts),
            rocks: CoordinateProjector::to_polar(&rock_pts),
        };

        let level = near_level(pose.pitch, self.config.pitch_tolerance_deg)
            && near_level(pose.roll, self.config.roll_tolerance_deg);
        if level {
            map.record_terrain(&self.projector.to_world(&obs_pts, pose), Channel::Obstacle);
            map.record_terrain(&self.projector.to_world(&nav_pts, pose), Channel::Navigable);
            if let Some((x, y)) = closest_point(&rock_pts, &observations.rocks.dists) {
                let cell = self.projector.world_cell(x, y, pose);
                debug!(x = cell.x, y = cell.y, "sample rock localised");
                map.record_rock(cell);
            }
        } else {
            debug!(pitch = pose.pitch, roll = pose.roll, "rover not level, map update skipped");
        }

        debug!(
            navigable = observations.navigable.len(),
            obstacles = observations.obstacles.len(),
            rocks = observations.rocks.len(),
            "perception pass complete"
        );

        PerceptionOutput {
            observations,
            vision,
            map_updated: level,
        }
    }

    /// The classifier for frames of this size, re-planning if needed.
    fn classifier_for(&mut self, width: u32, height: u32) -> Option<&ImageClassifier> {
        let planned = self.classifier.as_ref().map(ImageClassifier::frame_size);
        if planned != Some((width, height)) {
            warn!(?planned, width, height, "frame size changed, re-planning perspective warp");
            self.classifier = match ImageClassifier::new(&self.config, width, height) {
                Ok(c) => Some(c),
                Err(e) => {
                    warn!(error = %e, "perspective re-plan failed, frame ignored");
                    None
                }
            };
        }
        self.classifier.as_ref()
    }
}

fn closest_point(points: &RoverPoints, dists: &[f32]) -> Option<(f32, f32)> {
    let idx = dists
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)?;
    Some((points.xs[idx], points.ys[idx]))
}

fn vision_raster(masks: &ClassifiedMasks) -> RgbImage {
    let on = |b: bool| if b { 255 } else { 0 };
    RgbImage::from_fn(masks.fov.width(), masks.fov.height(), |c, r| {
        Rgb([
            on(masks.obstacle.get(c, r)),
            on(masks.rock.get(c, r)),
            on(masks.navigable.get(c, r)),
        ])
    })
}
