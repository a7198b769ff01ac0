//! Steering range and slew-rate limiting.

/// Clamps steering to `±max_steer` and limits the per-tick change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringLimiter {
    max_steer: f32,
    max_delta: f32,
}

impl SteeringLimiter {
    /// Limit steering to `±max_steer` degrees, moving at most `max_delta` per tick.
    pub fn new(max_steer: f32, max_delta: f32) -> Self {
        Self {
            max_steer,
            max_delta,
        }
    }

    /// `angle_deg` clamped to the steering range. NaN maps to straight ahead.
    pub fn clamp(&self, angle_deg: f32) -> f32 {
        if angle_deg.is_nan() {
            return 0.0;
        }
        angle_deg.clamp(-self.max_steer, self.max_steer)
    }

    /// Move from `previous` toward `target` by at most the rate limit.
    pub fn smooth(&self, target: f32, previous: f32) -> f32 {
        let target = self.clamp(target);
        let previous = self.clamp(previous);
        let next = if (target - previous).abs() > self.max_delta {
            if target >= previous {
                previous + self.max_delta
            } else {
                previous - self.max_delta
            }
        } else {
            target
        };
        self.clamp(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_to_range() {
        let l = SteeringLimiter::new(15.0, 5.0);
        assert_eq!(l.clamp(40.0), 15.0);
        assert_eq!(l.clamp(-40.0), -15.0);
        assert_eq!(l.clamp(3.5), 3.5);
        assert_eq!(l.clamp(f32::NAN), 0.0);
    }

    #[test]
    fn small_changes_pass_through() {
        let l = SteeringLimiter::new(15.0, 5.0);
        assert_eq!(l.smooth(4.0, 0.0), 4.0);
        assert_eq!(l.smooth(-5.0, 0.0), -5.0);
    }

    #[test]
    fn large_changes_are_rate_limited() {
        let l = SteeringLimiter::new(15.0, 5.0);
        assert_eq!(l.smooth(15.0, 0.0), 5.0);
        assert_eq!(l.smooth(-15.0, 15.0), 10.0);
    }

    #[test]
    fn ramp_reaches_target() {
        let l = SteeringLimiter::new(15.0, 5.0);
        let mut steer = 0.0;
        let mut history = Vec::new();
        for _ in 0..4 {
            steer = l.smooth(-15.0, steer);
            history.push(steer);
        }
        assert_eq!(history, vec![-5.0, -10.0, -15.0, -15.0]);
    }
}
