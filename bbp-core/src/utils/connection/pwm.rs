//! PCA9685 servo backend.
//!
//! Drives the three platform servos directly from a PCA9685 PWM expander on
//! a shared I2C bus, bypassing the serial microcontroller. Standard hobby
//! servo timing at 50 Hz: 500 µs = 0°, 2500 µs = 180°.

use core::cell::RefCell;

use embedded_hal::i2c::I2c;
use embedded_hal_bus::i2c::RefCellDevice;
use pwm_pca9685::{Address as PwmAddress, Channel, Error as Pca9685Error, Pca9685};

use crate::utils::{connection::ServoActuator, controllers::Servo};

/// Default I2C address of the PCA9685.
pub const PWM_ADDRESS: u8 = 0x40;

/// Pulse width at 0° (µs).
const PULSE_MIN_US: f32 = 500.0;
/// Pulse width at 180° (µs).
const PULSE_MAX_US: f32 = 2500.0;
/// 50 Hz frame (µs).
const PERIOD_US: f32 = 20_000.0;
/// Counter steps per PWM frame.
const PWM_COUNTS: f32 = 4096.0;
/// 25 MHz / (4096 × 50 Hz) − 1.
const PRESCALE_50HZ: u8 = 121;
const MAX_ANGLE: f32 = 180.0;

/// Errors from the PWM servo backend.
#[derive(Debug)]
pub enum PwmError<E: core::fmt::Debug> {
    Pca(Pca9685Error<E>),
    InvalidAngle,
}

/// Three servos on consecutive PCA9685 channels.
pub struct PwmServos<'a, I2C> {
    pwm: Pca9685<RefCellDevice<'a, I2C>>,
    channels: [Channel; 3],
}

impl<'a, I2C, E> PwmServos<'a, I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    /// Attach to the PCA9685 at `address`; Top, Left and Right use channels
    /// 0, 1 and 2. Call [`PwmServos::configure`] before the first command.
    pub fn new(
        i2c_bus: &'a RefCell<I2C>,
        address: u8,
    ) -> Result<Self, PwmError<E>> {
        let pwm = Pca9685::new(RefCellDevice::new(i2c_bus), PwmAddress::from(address))
            .map_err(PwmError::Pca)?;
        Ok(Self {
            pwm,
            channels: [Channel::C0, Channel::C1, Channel::C2],
        })
    }

    /// Use a different channel per servo, `[top, left, right]`.
    pub fn with_channels(
        mut self,
        channels: [Channel; 3],
    ) -> Self {
        self.channels = channels;
        self
    }

    /// Enable the oscillator and set the 50 Hz servo frame.
    pub fn configure(&mut self) -> Result<(), PwmError<E>> {
        self.pwm.enable().map_err(PwmError::Pca)?;
        tracing::info!("PWM enabled");
        self.pwm
            .set_prescale(PRESCALE_50HZ)
            .map_err(PwmError::Pca)?;
        tracing::info!("PWM prescale set to 50Hz");
        Ok(())
    }

    /// Stop all outputs.
    pub fn disable(&mut self) -> Result<(), PwmError<E>> {
        self.pwm.disable().map_err(PwmError::Pca)
    }

    /// Off count within the 4096-step frame for `angle` degrees.
    pub fn off_count(angle: f32) -> u16 {
        let angle = angle.clamp(0.0, MAX_ANGLE);
        let pulse_us = PULSE_MIN_US + (PULSE_MAX_US - PULSE_MIN_US) * angle / MAX_ANGLE;
        libm::roundf(pulse_us / PERIOD_US * PWM_COUNTS) as u16
    }
}

impl<'a, I2C, E> ServoActuator for PwmServos<'a, I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    type Error = PwmError<E>;

    fn set_angle(
        &mut self,
        servo: Servo,
        angle: f32,
    ) -> Result<(), Self::Error> {
        if !angle.is_finite() {
            return Err(PwmError::InvalidAngle);
        }
        let off = Self::off_count(angle);
        tracing::trace!(?servo, angle, off, "pwm servo command");
        self.pwm
            .set_channel_on_off(self.channels[servo.index()], 0, off)
            .map_err(PwmError::Pca)
    }
}
