//! Exponential gain ramp math
//!
//! Volume transitions on the music gain are exponential ramps between two
//! strictly positive values. An exponential ramp cannot reach 0.0, so every
//! target is floored at [`MIN_RAMP_TARGET`].
//!
//! Formula for a ramp from `v0` at `t0` to `v1` at `t1`:
//!
//! ```text
//! v(t) = v0 * (v1 / v0) ^ ((t - t0) / (t1 - t0))
//! ```
//!
//! The curve is monotonic between its endpoints: decreasing when `v1 < v0`,
//! increasing when `v1 > v0`.

use serde::{Deserialize, Serialize};

/// Lowest value a ramp may target
///
/// Exponential ramp primitives reject a true-zero endpoint.
pub const MIN_RAMP_TARGET: f32 = 0.01;

/// Floor a requested volume so it is a legal exponential ramp endpoint
pub fn ramp_target(volume: f32) -> f32 {
    if volume.is_nan() {
        return MIN_RAMP_TARGET;
    }
    volume.max(MIN_RAMP_TARGET)
}

/// One scheduled exponential ramp
///
/// Times are in seconds on the audio context clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialRamp {
    /// Value at `start_time`
    pub start_value: f32,
    /// Value reached at `end_time`
    pub target: f32,
    /// Ramp start (context seconds)
    pub start_time: f64,
    /// Ramp end (context seconds)
    pub end_time: f64,
}

impl ExponentialRamp {
    /// Create a ramp, flooring both endpoints at [`MIN_RAMP_TARGET`]
    pub fn new(start_value: f32, target: f32, start_time: f64, end_time: f64) -> Self {
        Self {
            start_value: ramp_target(start_value),
            target: ramp_target(target),
            start_time,
            end_time: end_time.max(start_time),
        }
    }

    /// Ramp duration in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Gain value at context time `t`
    ///
    /// Before the ramp starts this is `start_value`; after it ends, `target`.
    pub fn value_at(&self, t: f64) -> f32 {
        if t <= self.start_time {
            return self.start_value;
        }
        if t >= self.end_time || self.duration() <= 0.0 {
            return self.target;
        }

        let progress = (t - self.start_time) / self.duration();
        let ratio = f64::from(self.target) / f64::from(self.start_value);
        (f64::from(self.start_value) * ratio.powf(progress)) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_target_floors_zero() {
        assert_eq!(ramp_target(0.0), MIN_RAMP_TARGET);
        assert_eq!(ramp_target(-1.0), MIN_RAMP_TARGET);
        assert_eq!(ramp_target(f32::NAN), MIN_RAMP_TARGET);
        assert_eq!(ramp_target(0.35), 0.35);
    }

    #[test]
    fn test_endpoints() {
        let ramp = ExponentialRamp::new(1.0, 0.35, 2.0, 2.5);
        assert_eq!(ramp.value_at(1.0), 1.0);
        assert_eq!(ramp.value_at(2.0), 1.0);
        assert_eq!(ramp.value_at(2.5), 0.35);
        assert_eq!(ramp.value_at(10.0), 0.35);
    }

    #[test]
    fn test_downward_ramp_is_monotonic() {
        let ramp = ExponentialRamp::new(1.0, 0.35, 0.0, 0.5);
        let mut previous = ramp.value_at(0.0);
        for step in 1..=100 {
            let value = ramp.value_at(step as f64 * 0.005);
            assert!(value <= previous, "ramp rose at step {}", step);
            previous = value;
        }
    }

    #[test]
    fn test_upward_ramp_is_monotonic() {
        let ramp = ExponentialRamp::new(0.35, 1.0, 0.0, 0.5);
        let mut previous = ramp.value_at(0.0);
        for step in 1..=100 {
            let value = ramp.value_at(step as f64 * 0.005);
            assert!(value >= previous, "ramp fell at step {}", step);
            previous = value;
        }
    }

    #[test]
    fn test_zero_target_never_reached() {
        let ramp = ExponentialRamp::new(1.0, 0.0, 0.0, 1.0);
        assert_eq!(ramp.target, MIN_RAMP_TARGET);
        for step in 0..=20 {
            assert!(ramp.value_at(step as f64 * 0.05) > 0.0);
        }
    }

    #[test]
    fn test_zero_duration_jumps_to_target() {
        let ramp = ExponentialRamp::new(1.0, 0.5, 3.0, 3.0);
        assert_eq!(ramp.value_at(3.0), 1.0);
        assert_eq!(ramp.value_at(3.0001), 0.5);
    }
}
