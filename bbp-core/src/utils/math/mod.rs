//! Math utilities for the ball balancing platform.
//!
//! Axis projection over 2-D vectors, the simulated platform kinematics, the
//! camera-space calibration of the three servo axes and cosine-eased
//! setpoint trajectories.

pub mod calibration;
pub mod kinematics;
pub mod trajectory;
pub mod vector;
