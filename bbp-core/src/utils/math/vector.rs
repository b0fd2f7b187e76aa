//! Planar vectors and axis projection.
//!
//! Ball positions, setpoints and servo directions all live in the same 2-D
//! plane. A servo "sees" the ball only through the projection of its position
//! onto that servo's unit direction vector.
//!
//! # Example
//! ```rust
//! use bbp_core::utils::math::vector::{project_error, Vector2};
//! let e = project_error(Vector2::ZERO, Vector2::new(10.0, 0.0), Vector2::new(1.0, 0.0));
//! assert_eq!(e, 10.0);
//! ```
use core::ops::{Add, AddAssign, Mul, Neg, Sub};

use core::f32::consts::PI;
use serde::{Deserialize, Serialize};

/// Immutable pair of scalars `(x, y)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(
        x: f32,
        y: f32,
    ) -> Self {
        Self { x, y }
    }

    pub fn dot(
        self,
        other: Vector2,
    ) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn magnitude(self) -> f32 {
        libm::sqrtf(self.dot(self))
    }

    /// Unit vector pointing the same way, or `None` for a zero or
    /// non-finite vector.
    pub fn normalized(self) -> Option<Vector2> {
        let m = self.magnitude();
        if m > 0.0 && m.is_finite() {
            Some(self * (1.0 / m))
        } else {
            None
        }
    }

    /// Rotate counter-clockwise by `degrees`.
    pub fn rotated(
        self,
        degrees: f32,
    ) -> Vector2 {
        let r = degrees * (PI / 180.0);
        let (s, c) = (libm::sinf(r), libm::cosf(r));
        Vector2::new(c * self.x - s * self.y, s * self.x + c * self.y)
    }

    /// Euclidean distance between two points.
    pub fn distance(
        self,
        other: Vector2,
    ) -> f32 {
        (other - self).magnitude()
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    fn add(
        self,
        rhs: Vector2,
    ) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(
        &mut self,
        rhs: Vector2,
    ) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2 {
    type Output = Vector2;

    fn sub(
        self,
        rhs: Vector2,
    ) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vector2 {
    type Output = Vector2;

    fn mul(
        self,
        rhs: f32,
    ) -> Vector2 {
        Vector2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vector2 {
    type Output = Vector2;

    fn neg(self) -> Vector2 {
        Vector2::new(-self.x, -self.y)
    }
}

impl From<(f32, f32)> for Vector2 {
    fn from((x, y): (f32, f32)) -> Self {
        Vector2::new(x, y)
    }
}

/// Scalar displacement of `v` along `direction`.
pub fn project(
    v: Vector2,
    direction: Vector2,
) -> f32 {
    v.dot(direction)
}

/// Error along one servo axis: `(setpoint·d) − (position·d)`.
pub fn project_error(
    position: Vector2,
    setpoint: Vector2,
    direction: Vector2,
) -> f32 {
    project(setpoint, direction) - project(position, direction)
}
