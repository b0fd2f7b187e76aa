//! Module Exports
//!
//! Per-axis PID control for the three platform servos.
//!
//! - `pid`: the fixed-step PID controller and its projection strategy
//! - `observer`: sample hooks invoked after every computation
//! - `driver`: the control loop and the hardware-free simulation

pub mod driver;
pub mod observer;
pub mod pid;

use serde::{Deserialize, Serialize};

use crate::utils::{
    config::ConfigError,
    math::vector::Vector2,
};
use observer::{NoopObserver, SampleObserver};
use pid::{Gains, OutputLimits, PidController, Projection};

/// The three platform servos, in command order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Servo {
    Top,
    Left,
    Right,
}

impl Servo {
    pub const ALL: [Servo; 3] = [Servo::Top, Servo::Left, Servo::Right];

    pub const fn index(self) -> usize {
        match self {
            Servo::Top => 0,
            Servo::Left => 1,
            Servo::Right => 2,
        }
    }

    /// Mounting angle around the platform (deg, CCW from the top servo).
    pub const fn rotation_deg(self) -> f32 {
        match self {
            Servo::Top => 0.0,
            Servo::Left => 120.0,
            Servo::Right => 240.0,
        }
    }
}

/// Static configuration of one servo axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    direction: Vector2,
    gains: Gains,
}

impl AxisConfig {
    /// Normalizes `direction`; a zero direction is rejected.
    pub fn new(
        direction: Vector2,
        gains: Gains,
    ) -> Result<Self, ConfigError> {
        gains.validate()?;
        let direction = direction.normalized().ok_or(ConfigError::InvalidConfiguration(
            "axis direction must have non-zero magnitude",
        ))?;
        Ok(Self { direction, gains })
    }

    /// Axes for the equilateral layout: `reference` rotated by 0°, 120° and
    /// 240°, one per servo.
    pub fn triangle(
        reference: Vector2,
        gains: [Gains; 3],
    ) -> Result<[AxisConfig; 3], ConfigError> {
        let axis = |servo: Servo| {
            AxisConfig::new(reference.rotated(servo.rotation_deg()), gains[servo.index()])
        };
        Ok([axis(Servo::Top)?, axis(Servo::Left)?, axis(Servo::Right)?])
    }

    pub fn direction(&self) -> Vector2 {
        self.direction
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }
}

/// Planar ball position and setpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopState {
    pub position: Vector2,
    pub setpoint: Vector2,
}

/// Per-axis scalar position and setpoint, `[top, left, right]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisReadings {
    pub position: [f32; 3],
    pub setpoint: [f32; 3],
}

/// Input to one control iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Feedback {
    Planar(LoopState),
    PerAxis(AxisReadings),
}

/// Three independent PID controllers, one per servo.
pub struct PlatformController<O = NoopObserver> {
    axes: [PidController<O>; 3],
}

impl PlatformController<NoopObserver> {
    /// Controllers projecting planar feedback onto each axis direction.
    pub fn new(
        axes: [AxisConfig; 3],
        limits: OutputLimits,
    ) -> Result<Self, ConfigError> {
        let pid = |a: &AxisConfig| {
            PidController::new(a.gains, Projection::Axis(a.direction), limits)
        };
        Ok(Self {
            axes: [pid(&axes[0])?, pid(&axes[1])?, pid(&axes[2])?],
        })
    }

    /// Controllers fed with already projected per-axis readings.
    pub fn per_axis(
        gains: [Gains; 3],
        limits: OutputLimits,
    ) -> Result<Self, ConfigError> {
        let pid = |g: Gains| PidController::new(g, Projection::Raw, limits);
        Ok(Self {
            axes: [pid(gains[0])?, pid(gains[1])?, pid(gains[2])?],
        })
    }
}

impl<O: SampleObserver> PlatformController<O> {
    /// Attach one observer per axis, `[top, left, right]`.
    pub fn with_observers<P: SampleObserver>(
        self,
        observers: [P; 3],
    ) -> PlatformController<P> {
        let [top, left, right] = self.axes;
        let [o_top, o_left, o_right] = observers;
        PlatformController {
            axes: [
                top.with_observer(o_top),
                left.with_observer(o_left),
                right.with_observer(o_right),
            ],
        }
    }

    /// One control update; returns the clamped actions `[top, left, right]`.
    pub fn compute(
        &mut self,
        feedback: &Feedback,
    ) -> [f32; 3] {
        let mut actions = [0.0; 3];
        for (i, pid) in self.axes.iter_mut().enumerate() {
            actions[i] = match feedback {
                Feedback::Planar(state) => pid.compute_action(state.position, state.setpoint),
                Feedback::PerAxis(r) => pid.compute_scalar(r.position[i], r.setpoint[i]),
            };
        }
        actions
    }

    pub fn axis(
        &self,
        servo: Servo,
    ) -> &PidController<O> {
        &self.axes[servo.index()]
    }

    pub fn axis_mut(
        &mut self,
        servo: Servo,
    ) -> &mut PidController<O> {
        &mut self.axes[servo.index()]
    }

    pub fn into_axes(self) -> [PidController<O>; 3] {
        self.axes
    }
}
