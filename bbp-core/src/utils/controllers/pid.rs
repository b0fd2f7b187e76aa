//! Fixed-step PID controller for one servo axis.
//!
//! The controller runs once per loop iteration and has no notion of
//! elapsed time: the integral is a plain running sum of errors and the
//! derivative is the difference to the previous error.
//!
//! The integral is unbounded (no anti-windup, no decay); only the final
//! action is clamped.
//!
//! # Example
//! ```rust
//! use bbp_core::utils::controllers::pid::{Gains, OutputLimits, PidController, Projection};
//! use bbp_core::utils::math::vector::Vector2;
//! let mut pid = PidController::new(
//!     Gains::new(1.0, 0.0, 0.0),
//!     Projection::axis(Vector2::new(1.0, 0.0)).unwrap(),
//!     OutputLimits::default(),
//! ).unwrap();
//! assert_eq!(pid.compute_action(Vector2::ZERO, Vector2::new(10.0, 0.0)), 10.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::utils::{
    config::ConfigError,
    controllers::observer::{NoopObserver, Sample, SampleObserver},
    math::vector::{project, Vector2},
};

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl Gains {
    pub const fn new(
        kp: f32,
        ki: f32,
        kd: f32,
    ) -> Self {
        Self { kp, ki, kd }
    }

    /// Gains must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ok = |g: f32| g.is_finite() && g >= 0.0;
        if ok(self.kp) && ok(self.ki) && ok(self.kd) {
            Ok(())
        } else {
            Err(ConfigError::InvalidConfiguration(
                "PID gains must be finite and non-negative",
            ))
        }
    }
}

impl Default for Gains {
    fn default() -> Self {
        Self::new(0.5, 0.000_001, 7.0)
    }
}

/// Actuation clamp range in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputLimits {
    pub min: f32,
    pub max: f32,
}

impl OutputLimits {
    /// Full servo travel around neutral.
    pub const SYMMETRIC: OutputLimits = OutputLimits {
        min: -45.0,
        max: 45.0,
    };
    /// Limited downward travel.
    pub const ASYMMETRIC: OutputLimits = OutputLimits {
        min: -10.0,
        max: 45.0,
    };

    pub fn new(
        min: f32,
        max: f32,
    ) -> Result<Self, ConfigError> {
        let limits = Self { min, max };
        limits.validate()?;
        Ok(limits)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min.is_finite() && self.max.is_finite() && self.min < self.max {
            Ok(())
        } else {
            Err(ConfigError::InvalidConfiguration(
                "output limits must be finite with min < max",
            ))
        }
    }

    pub fn clamp(
        &self,
        value: f32,
    ) -> f32 {
        value.clamp(self.min, self.max)
    }
}

impl Default for OutputLimits {
    fn default() -> Self {
        Self::SYMMETRIC
    }
}

/// How a controller turns readings into its error signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "direction", rename_all = "snake_case")]
pub enum Projection {
    /// Readings are already per-axis scalars: `error = setpoint − position`.
    /// Planar readings contribute their x component only.
    Raw,
    /// Readings are planar and projected onto this unit direction.
    Axis(Vector2),
}

impl Projection {
    /// Normalized axis projection; fails for a zero or non-finite direction.
    pub fn axis(direction: Vector2) -> Result<Self, ConfigError> {
        direction
            .normalized()
            .map(Projection::Axis)
            .ok_or(ConfigError::InvalidConfiguration(
                "axis direction must have non-zero magnitude",
            ))
    }

    /// Position of a planar reading along this projection.
    pub fn measure(
        &self,
        v: Vector2,
    ) -> f32 {
        match self {
            Projection::Raw => v.x,
            Projection::Axis(d) => project(v, *d),
        }
    }

    fn validated(self) -> Result<Self, ConfigError> {
        match self {
            Projection::Raw => Ok(self),
            Projection::Axis(d) => Projection::axis(d),
        }
    }
}

/// A discrete, dt-less PID controller.
pub struct PidController<O = NoopObserver> {
    gains: Gains,
    limits: OutputLimits,
    projection: Projection,
    integral: f32,
    prev_error: f32,
    observer: O,
}

impl PidController<NoopObserver> {
    /// Create a controller with zeroed state.
    ///
    /// Fails with `InvalidConfiguration` for a zero-magnitude axis, invalid
    /// gains or an empty output range.
    pub fn new(
        gains: Gains,
        projection: Projection,
        limits: OutputLimits,
    ) -> Result<Self, ConfigError> {
        gains.validate()?;
        limits.validate()?;
        let projection = projection.validated()?;
        Ok(Self {
            gains,
            limits,
            projection,
            integral: 0.0,
            prev_error: 0.0,
            observer: NoopObserver,
        })
    }
}

impl<O: SampleObserver> PidController<O> {
    /// Replace the observer, keeping gains and state.
    pub fn with_observer<P: SampleObserver>(
        self,
        observer: P,
    ) -> PidController<P> {
        PidController {
            gains: self.gains,
            limits: self.limits,
            projection: self.projection,
            integral: self.integral,
            prev_error: self.prev_error,
            observer,
        }
    }

    /// Compute the clamped action for planar position and setpoint.
    pub fn compute_action(
        &mut self,
        position: Vector2,
        setpoint: Vector2,
    ) -> f32 {
        let measured = self.projection.measure(position);
        let error = self.projection.measure(setpoint) - measured;
        self.step(error, measured)
    }

    /// Compute the clamped action for per-axis scalar readings.
    pub fn compute_scalar(
        &mut self,
        position: f32,
        setpoint: f32,
    ) -> f32 {
        self.step(setpoint - position, position)
    }

    fn step(
        &mut self,
        error: f32,
        measured: f32,
    ) -> f32 {
        self.integral += error;
        let derivative = error - self.prev_error;
        let Gains { kp, ki, kd } = self.gains;
        let raw = kp * error + ki * self.integral + kd * derivative;
        let action = self.limits.clamp(raw);
        self.prev_error = error;

        self.observer.on_sample(&Sample {
            error,
            action,
            position: measured,
            integral: self.integral,
        });
        action
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    pub fn limits(&self) -> OutputLimits {
        self.limits
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Accumulated error sum.
    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn prev_error(&self) -> f32 {
        self.prev_error
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }
}
