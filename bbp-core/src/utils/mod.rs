//! Utility re-exports for the ball balancing platform.
//!
//! - `config`: serde-backed configuration document and its validation
//! - `connection`: servo actuators (serial line protocol, PCA9685 PWM) and
//!   the tracking subprocess feed
//! - `controllers`: per-axis PID controllers, the three-axis platform
//!   controller and the control loop driver
//! - `math`: vectors, axis projection, platform kinematics, camera
//!   calibration and setpoint trajectories

pub mod config;
pub mod connection;
pub mod controllers;
pub mod math;

pub use config::{BalancerConfig, ConfigError};
pub use connection::{ActuatorError, ServoActuator};
pub use controllers::{
    driver::{ControlLoop, Simulation, TickReport},
    AxisConfig, AxisReadings, Feedback, LoopState, PlatformController, Servo,
};
pub use math::vector::Vector2;
