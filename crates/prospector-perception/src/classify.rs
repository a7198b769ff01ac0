//! Terrain classification: perspective warp followed by colour thresholds.
//!
//! [`ImageClassifier::classify`] turns a raw camera frame into
//! [`ClassifiedMasks`] in the warped, top-down view:
//!
//! - **navigable** – every RGB channel strictly above the configured bound
//!   (bright, flat sand);
//! - **obstacle** – not navigable, restricted to the camera's field of view
//!   so that unseen pixels are never reported as obstacles;
//! - **rock** – inside the configured [`RockBand`] colour window, also
//!   restricted to the field of view (unseen pixels are black).

use image::RgbImage;
use prospector_types::ProspectorError;

use crate::config::{PerceptionConfig, RockBand};
use crate::homography::Homography;
use crate::mask::Mask;

/// The three classification masks plus the field-of-view mask they were
/// derived from. All share the warped image's dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedMasks {
    pub navigable: Mask,
    pub obstacle: Mask,
    pub rock: Mask,
    pub fov: Mask,
}

/// Warps frames of one fixed size and classifies their pixels.
#[derive(Debug, Clone)]
pub struct ImageClassifier {
    homography: Homography,
    navigable_threshold: [u8; 3],
    rock_band: RockBand,
    width: u32,
    height: u32,
}

impl ImageClassifier {
    /// Build a classifier for `width × height` frames.
    ///
    /// # Errors
    ///
    /// Returns [`ProspectorError::InvalidCalibration`] when the configured
    /// source points cannot define a perspective transform.
    pub fn new(config: &PerceptionConfig, width: u32, height: u32) -> Result<Self, ProspectorError> {
        let dst = config.destination_points(width, height);
        let homography = Homography::from_points(&config.source_points, &dst)?;
        Ok(Self {
            homography,
            navigable_threshold: config.navigable_threshold,
            rock_band: config.rock_band.clone(),
            width,
            height,
        })
    }

    /// Frame dimensions this classifier was calibrated for.
    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Warp `frame` and classify every pixel of the warped view.
    pub fn classify(&self, frame: &RgbImage) -> ClassifiedMasks {
        let (warped, fov) = self.homography.warp(frame);
        let navigable = navigable_mask(&warped, self.navigable_threshold);
        let obstacle = fov.and_not(&navigable);
        let rock = rock_mask(&warped, &self.rock_band).and(&fov);
        ClassifiedMasks {
            navigable,
            obstacle,
            rock,
            fov,
        }
    }
}

/// Pixels whose every channel is strictly above `threshold`.
pub fn navigable_mask(img: &RgbImage, threshold: [u8; 3]) -> Mask {
    Mask::from_fn(img.width(), img.height(), |col, row| {
        let [r, g, b] = img.get_pixel(col, row).0;
        r > threshold[0] && g > threshold[1] && b > threshold[2]
    })
}

/// Pixels inside the rock colour window.
pub fn rock_mask(img: &RgbImage, band: &RockBand) -> Mask {
    Mask::from_fn(img.width(), img.height(), |col, row| {
        band.contains(img.get_pixel(col, row).0)
    })
}
