//! Cosine-eased setpoint motion.
//!
//! When the operator picks a new target the setpoint does not jump; it eases
//! from where it currently is to the new target at a fixed nominal speed.
//! Time is passed in explicitly (seconds, any epoch) so the trajectory stays
//! deterministic and testable.
use core::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::utils::math::vector::Vector2;

/// Setpoint travel speed in position units per second.
pub const DEFAULT_SPEED: f32 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetpointTrajectory {
    from: Vector2,
    to: Vector2,
    start: f32,
    duration: f32,
    speed: f32,
}

impl SetpointTrajectory {
    /// A trajectory resting at `setpoint`.
    pub fn new(
        setpoint: Vector2,
        speed: f32,
    ) -> Self {
        Self {
            from: setpoint,
            to: setpoint,
            start: 0.0,
            duration: 0.0,
            speed,
        }
    }

    /// Start moving towards `target` from wherever the setpoint is at `now`.
    pub fn retarget(
        &mut self,
        target: Vector2,
        now: f32,
    ) {
        let current = self.sample(now);
        self.from = current;
        self.to = target;
        self.start = now;
        self.duration = if self.speed > 0.0 {
            current.distance(target) / self.speed
        } else {
            0.0
        };
        tracing::debug!(?current, ?target, duration = self.duration, "setpoint retargeted");
    }

    /// Interpolated setpoint at `now`.
    pub fn sample(
        &self,
        now: f32,
    ) -> Vector2 {
        if !(self.duration > 0.0) {
            return self.to;
        }
        let mu = ((now - self.start) / self.duration).clamp(0.0, 1.0);
        let mu2 = (1.0 - libm::cosf(mu * PI)) / 2.0;
        self.from * (1.0 - mu2) + self.to * mu2
    }

    pub fn target(&self) -> Vector2 {
        self.to
    }

    /// Whether the setpoint has reached its target at `now`.
    pub fn is_settled(
        &self,
        now: f32,
    ) -> bool {
        now - self.start >= self.duration
    }
}

impl Default for SetpointTrajectory {
    fn default() -> Self {
        Self::new(Vector2::ZERO, DEFAULT_SPEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_resting_trajectory_returns_setpoint() {
        let t = SetpointTrajectory::new(Vector2::new(320.0, 240.0), DEFAULT_SPEED);
        assert_eq!(t.sample(0.0), Vector2::new(320.0, 240.0));
        assert_eq!(t.sample(100.0), Vector2::new(320.0, 240.0));
    }

    #[test]
    fn test_endpoints_and_midpoint() {
        let mut t = SetpointTrajectory::new(Vector2::ZERO, DEFAULT_SPEED);
        // 240 units at 120 units/s -> 2 seconds.
        t.retarget(Vector2::new(240.0, 0.0), 10.0);
        assert_relative_eq!(t.sample(10.0).x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(t.sample(11.0).x, 120.0, epsilon = 1e-3);
        assert_relative_eq!(t.sample(12.0).x, 240.0, epsilon = 1e-3);
        assert_relative_eq!(t.sample(50.0).x, 240.0, epsilon = 1e-3);
        assert!(!t.is_settled(11.0));
        assert!(t.is_settled(12.0));
    }

    #[test]
    fn test_retarget_mid_move_starts_from_current_point() {
        let mut t = SetpointTrajectory::new(Vector2::ZERO, DEFAULT_SPEED);
        t.retarget(Vector2::new(240.0, 0.0), 0.0);
        let mid = t.sample(1.0);
        t.retarget(Vector2::new(0.0, 0.0), 1.0);
        assert_relative_eq!(t.sample(1.0).x, mid.x, epsilon = 1e-3);
        assert_eq!(t.target(), Vector2::ZERO);
    }

    #[test]
    fn test_easing_is_monotonic() {
        let mut t = SetpointTrajectory::new(Vector2::ZERO, DEFAULT_SPEED);
        t.retarget(Vector2::new(0.0, 120.0), 0.0);
        let mut last = -1.0;
        for i in 0..=10 {
            let y = t.sample(i as f32 * 0.1).y;
            assert!(y >= last);
            last = y;
        }
    }
}
