//! Planar homography and perspective warp.
//!
//! A [`Homography`] maps the forward-looking camera frame onto a top-down,
//! rover-centric view. It is solved from four point correspondences as the
//! 8×8 linear system
//!
//! ```text
//! [x y 1 0 0 0 -x·u -y·u] h = u
//! [0 0 0 x y 1 -x·v -y·v] h = v
//! ```
//!
//! with `h₈ = 1`.
//!
//! # Example
//!
//! ```rust
//! use prospector_perception::homography::Homography;
//!
//! let src = [[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]];
//! let dst = [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]];
//! let h = Homography::from_points(&src, &dst).unwrap();
//!
//! let (u, v) = h.apply(1.0, 1.0).unwrap();
//! assert!((u - 2.0).abs() < 1e-9 && (v - 2.0).abs() < 1e-9);
//! ```

use image::{Rgb, RgbImage};
use nalgebra::{Matrix3, SMatrix, SVector};
use prospector_types::ProspectorError;

use crate::mask::Mask;

/// Triangle area, relative to the squared extent of the point set, below
/// which three points count as collinear.
const COLLINEAR_TOLERANCE: f64 = 1e-6;

/// Slack allowed when testing whether a pre-image lies on the frame edge.
const EDGE_TOLERANCE: f64 = 1e-6;

/// A 3×3 projective transform together with its inverse.
#[derive(Debug, Clone, PartialEq)]
pub struct Homography {
    forward: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl Homography {
    /// Solve the transform that maps each `src[i]` onto `dst[i]`.
    ///
    /// Points are `[x, y]` (image column, image row).
    ///
    /// # Errors
    ///
    /// Returns [`ProspectorError::InvalidCalibration`] when the
    /// correspondences are degenerate (three or more collinear points, or
    /// repeated points).
    pub fn from_points(src: &[[f32; 2]; 4], dst: &[[f32; 2]; 4]) -> Result<Self, ProspectorError> {
        if is_degenerate(src) || is_degenerate(dst) {
            return Err(ProspectorError::InvalidCalibration(format!(
                "perspective points are degenerate: src={src:?} dst={dst:?}"
            )));
        }

        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
            let (x, y) = (f64::from(s[0]), f64::from(s[1]));
            let (u, v) = (f64::from(d[0]), f64::from(d[1]));
            let r = 2 * i;
            a.row_mut(r)
                .copy_from_slice(&[x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u]);
            a.row_mut(r + 1)
                .copy_from_slice(&[0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v]);
            b[r] = u;
            b[r + 1] = v;
        }

        let h = a.lu().solve(&b).ok_or_else(|| {
            ProspectorError::InvalidCalibration("perspective system has no solution".to_string())
        })?;

        let forward = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
        let inverse = forward.try_inverse().ok_or_else(|| {
            ProspectorError::InvalidCalibration("perspective transform is not invertible".to_string())
        })?;

        Ok(Self { forward, inverse })
    }

    /// Map a source-frame point into the destination frame.
    ///
    /// Returns `None` for points on the transform's line at infinity.
    pub fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        project(&self.forward, x, y)
    }

    /// Map a destination-frame point back into the source frame.
    pub fn apply_inverse(&self, u: f64, v: f64) -> Option<(f64, f64)> {
        project(&self.inverse, u, v)
    }

    /// Warp `frame` into the destination view.
    ///
    /// The output has the same dimensions as the input. Each output pixel is
    /// sampled bilinearly from the source; pixels whose pre-image falls
    /// outside the source are black and unset in the returned field-of-view
    /// mask.
    pub fn warp(&self, frame: &RgbImage) -> (RgbImage, Mask) {
        let (width, height) = frame.dimensions();
        let mut warped = RgbImage::new(width, height);
        let mut fov = Mask::new(width, height);

        let max_x = f64::from(width) - 1.0;
        let max_y = f64::from(height) - 1.0;

        for row in 0..height {
            for col in 0..width {
                let Some((sx, sy)) = self.apply_inverse(f64::from(col), f64::from(row)) else {
                    continue;
                };
                let inside = |v: f64, max: f64| v >= -EDGE_TOLERANCE && v <= max + EDGE_TOLERANCE;
                if !(inside(sx, max_x) && inside(sy, max_y)) {
                    continue;
                }
                fov.set(col, row, true);
                let (sx, sy) = (sx.clamp(0.0, max_x), sy.clamp(0.0, max_y));
                warped.put_pixel(col, row, sample_bilinear(frame, sx, sy));
            }
        }

        (warped, fov)
    }
}

/// `true` when any three of the points are collinear (repeated points
/// included). The test is relative to the spread of the points, so it does
/// not depend on the units they are given in.
fn is_degenerate(pts: &[[f32; 2]; 4]) -> bool {
    let p: Vec<(f64, f64)> = pts
        .iter()
        .map(|[x, y]| (f64::from(*x), f64::from(*y)))
        .collect();
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in &p {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let extent = (max_x - min_x).max(max_y - min_y);
    if !(extent.is_finite() && extent > 0.0) {
        return true;
    }
    let limit = COLLINEAR_TOLERANCE * extent * extent;
    [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)]
        .into_iter()
        .any(|(i, j, k)| {
            let (ax, ay) = (p[j].0 - p[i].0, p[j].1 - p[i].1);
            let (bx, by) = (p[k].0 - p[i].0, p[k].1 - p[i].1);
            (ax * by - ay * bx).abs() <= limit
        })
}

fn project(m: &Matrix3<f64>, x: f64, y: f64) -> Option<(f64, f64)> {
    let w = m[(2, 0)] * x + m[(2, 1)] * y + m[(2, 2)];
    if w.abs() < f64::EPSILON {
        return None;
    }
    let u = (m[(0, 0)] * x + m[(0, 1)] * y + m[(0, 2)]) / w;
    let v = (m[(1, 0)] * x + m[(1, 1)] * y + m[(1, 2)]) / w;
    Some((u, v))
}

/// Bilinear sample at a point already known to lie inside the image.
fn sample_bilinear(img: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (width, height) = img.dimensions();
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - f64::from(x0);
    let fy = y - f64::from(y0);

    let p00 = img.get_pixel(x0, y0).0;
    let p10 = img.get_pixel(x1, y0).0;
    let p01 = img.get_pixel(x0, y1).0;
    let p11 = img.get_pixel(x1, y1).0;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = f64::from(p00[c]) * (1.0 - fx) + f64::from(p10[c]) * fx;
        let bottom = f64::from(p01[c]) * (1.0 - fx) + f64::from(p11[c]) * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-6 && (a.1 - b.1).abs() < 1e-6
    }

    #[test]
    fn maps_each_correspondence() {
        let src = [[14.0, 140.0], [301.0, 140.0], [200.0, 96.0], [118.0, 96.0]];
        let dst = [[155.0, 154.0], [165.0, 154.0], [165.0, 144.0], [155.0, 144.0]];
        let h = Homography::from_points(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            let mapped = h.apply(f64::from(s[0]), f64::from(s[1])).unwrap();
            assert!(approx(mapped, (f64::from(d[0]), f64::from(d[1]))), "{mapped:?} vs {d:?}");
        }
    }

    #[test]
    fn inverse_undoes_forward() {
        let src = [[14.0, 140.0], [301.0, 140.0], [200.0, 96.0], [118.0, 96.0]];
        let dst = [[155.0, 154.0], [165.0, 154.0], [165.0, 144.0], [155.0, 144.0]];
        let h = Homography::from_points(&src, &dst).unwrap();
        let (u, v) = h.apply(160.0, 120.0).unwrap();
        let back = h.apply_inverse(u, v).unwrap();
        assert!(approx(back, (160.0, 120.0)));
    }

    #[test]
    fn collinear_points_are_rejected() {
        let src = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let dst = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let err = Homography::from_points(&src, &dst).unwrap_err();
        assert!(matches!(err, ProspectorError::InvalidCalibration(_)));
    }

    #[test]
    fn repeated_points_are_rejected() {
        let src = [[0.0, 0.0], [1.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let dst = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        assert!(Homography::from_points(&src, &dst).is_err());
    }

    #[test]
    fn small_unit_calibration_is_accepted() {
        // The simulator calibration expressed in kilo-pixels.
        let src = [[0.014, 0.140], [0.301, 0.140], [0.200, 0.096], [0.118, 0.096]];
        let dst = [[0.155, 0.154], [0.165, 0.154], [0.165, 0.144], [0.155, 0.144]];
        let h = Homography::from_points(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            let (u, v) = h.apply(f64::from(s[0]), f64::from(s[1])).unwrap();
            assert!((u - f64::from(d[0])).abs() < 1e-5 && (v - f64::from(d[1])).abs() < 1e-5);
        }
    }

    #[test]
    fn identity_warp_preserves_image() {
        let pts = [[0.0, 0.0], [3.0, 0.0], [3.0, 3.0], [0.0, 3.0]];
        let h = Homography::from_points(&pts, &pts).unwrap();
        let frame = RgbImage::from_fn(4, 4, |x, y| Rgb([(x * 40) as u8, (y * 40) as u8, 7]));
        let (warped, fov) = h.warp(&frame);
        assert_eq!(warped, frame);
        assert_eq!(fov.count(), 16);
    }

    #[test]
    fn shifted_warp_leaves_unseen_pixels_outside_fov() {
        // Shift the image two columns to the right.
        let src = [[0.0, 0.0], [3.0, 0.0], [3.0, 3.0], [0.0, 3.0]];
        let dst = [[2.0, 0.0], [5.0, 0.0], [5.0, 3.0], [2.0, 3.0]];
        let h = Homography::from_points(&src, &dst).unwrap();
        let frame = RgbImage::from_pixel(6, 4, Rgb([255, 255, 255]));
        let (warped, fov) = h.warp(&frame);
        for row in 0..4 {
            assert!(!fov.get(0, row));
            assert!(!fov.get(1, row));
            assert!(fov.get(2, row));
            assert_eq!(warped.get_pixel(0, row).0, [0, 0, 0]);
            assert_eq!(warped.get_pixel(4, row).0, [255, 255, 255]);
        }
    }
}
