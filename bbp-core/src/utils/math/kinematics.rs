//! Simulated kinematics for the three-servo tilting platform.
//!
//! `PlatformKinematics` maps the three servo angles (Top, Left, Right) to the
//! platform's roll and pitch; `BallSimulation` turns that tilt into ball
//! motion. This is an approximation used only to exercise the controller
//! without hardware, and it is not the inverse of the projection axes.
//!
//! # Example
//! ```rust
//! use bbp_core::utils::math::kinematics::PlatformKinematics;
//! let kin = PlatformKinematics::default();
//! let tilt = kin.tilt([0.0, 0.0, 0.0]);
//! assert!(tilt.roll.abs() < 1e-6);
//! ```
use core::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::utils::math::vector::Vector2;

/// Servo horn angle at which the horn is horizontal, in degrees.
const HORN_OFFSET_DEG: f32 = 45.0;

/// Geometry of the platform linkage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformKinematics {
    /// Servo horn length.
    pub arm_length: f32,
    /// Distance between neighbouring servo attachment points.
    pub servo_baseline: f32,
}

impl Default for PlatformKinematics {
    fn default() -> Self {
        Self {
            arm_length: 5.5,
            servo_baseline: 25.0,
        }
    }
}

/// Platform tilt in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tilt {
    pub roll: f32,
    pub pitch: f32,
}

impl PlatformKinematics {
    pub fn new(
        arm_length: f32,
        servo_baseline: f32,
    ) -> Self {
        Self {
            arm_length,
            servo_baseline,
        }
    }

    /// Height of the platform corner lifted by a servo at `angle` degrees.
    pub fn servo_height(
        &self,
        angle: f32,
    ) -> f32 {
        libm::cosf((angle + HORN_OFFSET_DEG) * (PI / 180.0)) * self.arm_length
    }

    /// Height of the equilateral triangle spanned by the servos.
    pub fn triangle_height(&self) -> f32 {
        let b = self.servo_baseline;
        libm::sqrtf(b * b - (b / 2.0) * (b / 2.0))
    }

    /// Forward mapping from `[top, left, right]` servo angles to tilt.
    pub fn tilt(
        &self,
        angles: [f32; 3],
    ) -> Tilt {
        let top = self.servo_height(angles[0]);
        let left = self.servo_height(angles[1]);
        let right = self.servo_height(angles[2]);

        let roll = libm::atanf((left - right) / self.servo_baseline);
        let pitch = libm::atanf((top - (left + right) / 2.0) / self.triangle_height());
        Tilt { roll, pitch }
    }
}

/// Point-mass ball rolling on the simulated platform.
///
/// Each step the tilt is added to the velocity (roll drives +x, pitch
/// drives −y) and the velocity to the position. No friction, no bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BallSimulation {
    pub position: Vector2,
    pub velocity: Vector2,
}

impl BallSimulation {
    pub fn at(position: Vector2) -> Self {
        Self {
            position,
            velocity: Vector2::ZERO,
        }
    }

    /// Advance one fixed step under `tilt` and return the new position.
    pub fn step(
        &mut self,
        tilt: Tilt,
    ) -> Vector2 {
        self.velocity.x += tilt.roll;
        self.velocity.y -= tilt.pitch;
        self.position += self.velocity;
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_level_platform_has_no_tilt() {
        let kin = PlatformKinematics::default();
        for a in [-45.0, -10.0, 0.0, 30.0, 45.0] {
            let tilt = kin.tilt([a, a, a]);
            assert_relative_eq!(tilt.roll, 0.0, epsilon = 1e-6);
            assert_relative_eq!(tilt.pitch, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_servo_height() {
        let kin = PlatformKinematics::default();
        // Horn pointing straight out at -45°.
        assert_relative_eq!(kin.servo_height(-45.0), 5.5, epsilon = 1e-5);
        assert_relative_eq!(kin.servo_height(45.0), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_triangle_height() {
        let kin = PlatformKinematics::new(5.5, 25.0);
        assert_relative_eq!(kin.triangle_height(), 21.650_635, epsilon = 1e-4);
    }

    #[test]
    fn test_left_lower_than_right_rolls_negative() {
        let kin = PlatformKinematics::default();
        // Larger angle -> lower corner.
        let tilt = kin.tilt([0.0, 30.0, 0.0]);
        assert!(tilt.roll < 0.0);
        let expected_roll =
            libm::atanf((kin.servo_height(30.0) - kin.servo_height(0.0)) / kin.servo_baseline);
        assert_relative_eq!(tilt.roll, expected_roll, epsilon = 1e-6);
    }

    #[test]
    fn test_top_raised_pitches_positive() {
        let kin = PlatformKinematics::default();
        let tilt = kin.tilt([-20.0, 0.0, 0.0]);
        assert!(tilt.pitch > 0.0);
        assert_relative_eq!(tilt.roll, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ball_accelerates_under_constant_tilt() {
        let mut ball = BallSimulation::at(Vector2::ZERO);
        let tilt = Tilt {
            roll: 0.1,
            pitch: 0.2,
        };
        ball.step(tilt);
        let p = ball.step(tilt);
        // v1 = (0.1, -0.2), v2 = (0.2, -0.4); p = v1 + v2
        assert_relative_eq!(p.x, 0.3, epsilon = 1e-6);
        assert_relative_eq!(p.y, -0.6, epsilon = 1e-6);
    }
}
