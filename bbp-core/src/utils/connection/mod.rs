//! Module Exports
//!
//! Links between the controller and the outside world.
//!
//! # Modules
//! - `serial`: line-oriented servo commands to a microcontroller
//! - `pwm`: servos driven directly by a PCA9685 over I2C
//! - `tracking`: the ball-tracking subprocess feed (`std` only)

pub mod pwm;
pub mod serial;
#[cfg(feature = "std")]
pub mod tracking;

use crate::utils::controllers::Servo;

/// Errors from the serial servo link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ActuatorError {
    #[error("serial port unavailable")]
    PortUnavailable,
    #[error("timed out writing servo command")]
    WriteTimeout,
    #[error("timed out waiting for servo acknowledgement")]
    ReadTimeout,
    #[error("malformed servo acknowledgement")]
    MalformedAck,
    #[error("servo angle is not a finite number")]
    InvalidAngle,
}

/// Something that can move a platform servo to an absolute angle (deg).
pub trait ServoActuator {
    type Error: core::fmt::Debug;

    fn set_angle(
        &mut self,
        servo: Servo,
        angle: f32,
    ) -> Result<(), Self::Error>;
}

impl<A: ServoActuator + ?Sized> ServoActuator for &mut A {
    type Error = A::Error;

    fn set_angle(
        &mut self,
        servo: Servo,
        angle: f32,
    ) -> Result<(), Self::Error> {
        (**self).set_angle(servo, angle)
    }
}
