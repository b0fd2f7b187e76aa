//! Camera-space calibration of the three servo axes.
//!
//! The operator marks the three servo corners (Top, Left, Right) in the
//! camera image. Their centroid becomes the platform centre. Each corner
//! gives one projection axis: the unit vector from the centre towards it. A
//! per-axis scale maps camera pixels onto a reference triangle of fixed side
//! length, so every corner projects to the same reading on its own axis.
//!
//! # Example
//! ```rust
//! use bbp_core::utils::math::{calibration::Calibration, vector::Vector2};
//! let cal = Calibration::from_points(
//!     [Vector2::new(300.0, 20.0), Vector2::new(50.0, 470.0), Vector2::new(600.0, 460.0)],
//!     Calibration::DEFAULT_TARGET_SIDE,
//! ).unwrap();
//! let readings = cal.project(cal.center());
//! assert!(readings.iter().all(|r| r.abs() < 1e-3));
//! ```
use serde::{Deserialize, Serialize};

use crate::utils::{
    config::ConfigError,
    controllers::{AxisConfig, AxisReadings},
    controllers::pid::Gains,
    math::vector::Vector2,
};

/// Calibrated projection axes in camera space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    center: Vector2,
    directions: [Vector2; 3],
    scales: [f32; 3],
}

impl Calibration {
    /// Side length of the reference triangle the readings are scaled to.
    pub const DEFAULT_TARGET_SIDE: f32 = 250.0;

    /// Build a calibration from the `[top, left, right]` corner points.
    ///
    /// Fails if `target_side` is not positive or a corner coincides with the
    /// centroid.
    pub fn from_points(
        points: [Vector2; 3],
        target_side: f32,
    ) -> Result<Self, ConfigError> {
        if !(target_side > 0.0 && target_side.is_finite()) {
            return Err(ConfigError::InvalidConfiguration(
                "calibration target side must be positive",
            ));
        }
        let center = (points[0] + points[1] + points[2]) * (1.0 / 3.0);
        // x coordinate of the reference triangle's centroid.
        let target_scale = target_side / 2.0;

        let mut directions = [Vector2::ZERO; 3];
        let mut scales = [0.0; 3];
        for (i, &p) in points.iter().enumerate() {
            let v = p - center;
            let direction = v.normalized().ok_or(ConfigError::InvalidConfiguration(
                "calibration point coincides with the platform centre",
            ))?;
            directions[i] = direction;
            scales[i] = target_scale / v.magnitude();
        }
        tracing::debug!(?center, ?directions, ?scales, "calibration complete");

        Ok(Self {
            center,
            directions,
            scales,
        })
    }

    pub fn center(&self) -> Vector2 {
        self.center
    }

    /// Unit axes in `[top, left, right]` order.
    pub fn directions(&self) -> [Vector2; 3] {
        self.directions
    }

    pub fn scales(&self) -> [f32; 3] {
        self.scales
    }

    /// Scaled per-axis readings of a camera-space point.
    pub fn project(
        &self,
        point: Vector2,
    ) -> [f32; 3] {
        let rel = point - self.center;
        let mut out = [0.0; 3];
        for i in 0..3 {
            out[i] = rel.dot(self.directions[i]) * self.scales[i];
        }
        out
    }

    /// Per-axis readings for a ball position and setpoint in camera space.
    pub fn readings(
        &self,
        position: Vector2,
        setpoint: Vector2,
    ) -> AxisReadings {
        AxisReadings {
            position: self.project(position),
            setpoint: self.project(setpoint),
        }
    }

    /// Axis configurations using the calibrated directions.
    pub fn axis_configs(
        &self,
        gains: [Gains; 3],
    ) -> Result<[AxisConfig; 3], ConfigError> {
        Ok([
            AxisConfig::new(self.directions[0], gains[0])?,
            AxisConfig::new(self.directions[1], gains[1])?,
            AxisConfig::new(self.directions[2], gains[2])?,
        ])
    }
}
