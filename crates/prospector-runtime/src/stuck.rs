//! [`StuckDetector`] – displacement-over-time watchdog.
//!
//! The detector keeps an anchor `(time, position)`. Each [`check`] after the
//! timeout has elapsed measures how far the rover moved since the anchor,
//! moves the anchor to the current sample, and reports stuck when the
//! displacement was below the minimum. Checks before the timeout never fire.
//!
//! [`check`]: StuckDetector::check
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use prospector_runtime::stuck::StuckDetector;
//! use prospector_types::Pose;
//!
//! let t0 = Instant::now();
//! let mut detector = StuckDetector::new(Duration::from_secs(15), 15.0);
//! detector.reanchor(t0, &Pose::new(0.0, 0.0, 0.0));
//!
//! // Moved 5 units in 20 s: stuck.
//! assert!(detector.check(t0 + Duration::from_secs(20), &Pose::new(3.0, 4.0, 0.0)));
//! ```

use std::time::{Duration, Instant};

use prospector_types::Pose;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    at: Instant,
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StuckDetector {
    timeout: Duration,
    min_displacement: f32,
    anchor: Option<Anchor>,
}

impl StuckDetector {
    /// Detector with no open window; the first [`check`](Self::check) opens one.
    pub fn new(timeout: Duration, min_displacement: f32) -> Self {
        Self {
            timeout,
            min_displacement,
            anchor: None,
        }
    }

    /// Start a new observation window at `now` and `pose`.
    pub fn reanchor(&mut self, now: Instant, pose: &Pose) {
        self.anchor = Some(Anchor {
            at: now,
            x: pose.x,
            y: pose.y,
        });
    }

    /// `true` when the window has expired with too little displacement.
    ///
    /// The first call only anchors the window.
    pub fn check(&mut self, now: Instant, pose: &Pose) -> bool {
        let Some(anchor) = self.anchor else {
            self.reanchor(now, pose);
            return false;
        };
        if now.saturating_duration_since(anchor.at) <= self.timeout {
            return false;
        }
        let moved = ((pose.x - anchor.x).powi(2) + (pose.y - anchor.y).powi(2)).sqrt();
        self.reanchor(now, pose);
        moved < self.min_displacement
    }

    /// Time the current window was opened, if any.
    pub fn anchored_at(&self) -> Option<Instant> {
        self.anchor.map(|a| a.at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn detector_at(t0: Instant) -> StuckDetector {
        let mut d = StuckDetector::new(secs(15), 15.0);
        d.reanchor(t0, &Pose::new(10.0, 10.0, 0.0));
        d
    }

    #[test]
    fn never_fires_before_timeout() {
        let t0 = Instant::now();
        let mut d = detector_at(t0);
        assert!(!d.check(t0 + secs(5), &Pose::new(10.0, 10.0, 0.0)));
        assert!(!d.check(t0 + secs(15), &Pose::new(10.0, 10.0, 0.0)));
        // Window untouched by early checks.
        assert_eq!(d.anchored_at(), Some(t0));
    }

    #[test]
    fn fires_after_timeout_with_small_displacement() {
        let t0 = Instant::now();
        let mut d = detector_at(t0);
        assert!(d.check(t0 + secs(20), &Pose::new(13.0, 14.0, 0.0)));
    }

    #[test]
    fn silent_after_timeout_with_large_displacement() {
        let t0 = Instant::now();
        let mut d = detector_at(t0);
        assert!(!d.check(t0 + secs(20), &Pose::new(30.0, 10.0, 0.0)));
        // And the window moved forward.
        assert_eq!(d.anchored_at(), Some(t0 + secs(20)));
    }

    #[test]
    fn window_reanchors_after_each_evaluation() {
        let t0 = Instant::now();
        let mut d = detector_at(t0);
        assert!(d.check(t0 + secs(16), &Pose::new(10.0, 10.0, 0.0)));
        // Next evaluation needs a full new window.
        assert!(!d.check(t0 + secs(20), &Pose::new(10.0, 10.0, 0.0)));
        assert!(d.check(t0 + secs(32), &Pose::new(10.0, 10.0, 0.0)));
    }

    #[test]
    fn first_check_only_anchors() {
        let t0 = Instant::now();
        let mut d = StuckDetector::new(secs(15), 15.0);
        assert!(!d.check(t0, &Pose::default()));
        assert_eq!(d.anchored_at(), Some(t0));
    }
}
