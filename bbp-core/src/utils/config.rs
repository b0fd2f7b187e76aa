//! Balancer configuration.
//!
//! Every field has a default, so an empty document (`{}`) is a valid
//! configuration. Values are checked by [`BalancerConfig::validate`]; an
//! invalid configuration is the only fatal error at startup.

use alloc::{string::String, vec::Vec};
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::{
    controllers::{
        pid::{Gains, OutputLimits},
        AxisConfig, PlatformController,
    },
    math::{kinematics::PlatformKinematics, trajectory::DEFAULT_SPEED, vector::Vector2},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
}

/// Serial link parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Read/write timeout, fixed for the lifetime of the port.
    pub timeout_secs: f32,
    /// Block for one acknowledgement line after every command.
    pub wait_for_ack: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::from("/dev/ttyUSB0"),
            baud_rate: 9600,
            timeout_secs: 1.0,
            wait_for_ack: true,
        }
    }
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f32(self.timeout_secs).unwrap_or(Duration::from_secs(1))
    }
}

/// Ball-tracking subprocess.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub program: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Gains shared by all three axes.
    pub gains: Gains,
    /// Per-axis gains `[top, left, right]`; overrides `gains` when set.
    pub axes: Option<[Gains; 3]>,
    pub output: OutputLimits,
    /// Direction of the top servo axis; the others are rotated from it.
    pub reference: Vector2,
    /// Added to every action before it is sent (servo neutral, deg).
    pub servo_offset: f32,
    pub kinematics: PlatformKinematics,
    pub serial: SerialConfig,
    pub tracker: TrackerConfig,
    /// Setpoint travel speed for eased retargeting.
    pub setpoint_speed: f32,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            gains: Gains::default(),
            axes: None,
            output: OutputLimits::default(),
            reference: Vector2::new(0.0, 1.0),
            servo_offset: 45.0,
            kinematics: PlatformKinematics::default(),
            serial: SerialConfig::default(),
            tracker: TrackerConfig::default(),
            setpoint_speed: DEFAULT_SPEED,
        }
    }
}

impl BalancerConfig {
    /// Effective gains `[top, left, right]`.
    pub fn axis_gains(&self) -> [Gains; 3] {
        self.axes.unwrap_or([self.gains; 3])
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for g in self.axis_gains() {
            g.validate()?;
        }
        self.output.validate()?;
        if self.reference.normalized().is_none() {
            return Err(ConfigError::InvalidConfiguration(
                "reference direction must have non-zero magnitude",
            ));
        }
        if !self.servo_offset.is_finite() {
            return Err(ConfigError::InvalidConfiguration("servo offset must be finite"));
        }
        let k = &self.kinematics;
        if !(k.arm_length > 0.0 && k.servo_baseline > 0.0) {
            return Err(ConfigError::InvalidConfiguration(
                "arm length and servo baseline must be positive",
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::InvalidConfiguration("baud rate must be positive"));
        }
        if !(self.serial.timeout_secs > 0.0 && self.serial.timeout_secs.is_finite()) {
            return Err(ConfigError::InvalidConfiguration("serial timeout must be positive"));
        }
        if !(self.setpoint_speed > 0.0 && self.setpoint_speed.is_finite()) {
            return Err(ConfigError::InvalidConfiguration("setpoint speed must be positive"));
        }
        Ok(())
    }

    /// Triangle axes built from `reference` and the effective gains.
    pub fn axis_configs(&self) -> Result<[AxisConfig; 3], ConfigError> {
        AxisConfig::triangle(self.reference, self.axis_gains())
    }

    /// Controller for planar feedback (simulation, calibrated camera input).
    pub fn planar_controller(&self) -> Result<PlatformController, ConfigError> {
        self.validate()?;
        PlatformController::new(self.axis_configs()?, self.output)
    }

    /// Controller for per-axis readings from the tracking subprocess.
    pub fn per_axis_controller(&self) -> Result<PlatformController, ConfigError> {
        self.validate()?;
        PlatformController::per_axis(self.axis_gains(), self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = BalancerConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.output, OutputLimits::SYMMETRIC);
        assert_eq!(cfg.serial.timeout(), Duration::from_secs(1));
        assert_eq!(cfg.axis_gains(), [Gains::default(); 3]);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let cfg: BalancerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, BalancerConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let cfg: BalancerConfig = serde_json::from_str(
            r#"{
                "gains": {"kp": 0.3, "ki": 0.001, "kd": 5.0},
                "output": {"min": -10.0, "max": 45.0},
                "serial": {"port": "COM3", "baud_rate": 57600},
                "tracker": {"program": "ball-tracking-app"}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.gains, Gains::new(0.3, 0.001, 5.0));
        assert_eq!(cfg.output, OutputLimits::ASYMMETRIC);
        assert_eq!(cfg.serial.port, "COM3");
        assert_eq!(cfg.serial.baud_rate, 57600);
        assert!(cfg.serial.wait_for_ack);
        assert_eq!(cfg.tracker.program.as_deref(), Some("ball-tracking-app"));
        assert_eq!(cfg.kinematics, PlatformKinematics::default());
    }

    #[test]
    fn test_per_axis_gains_override_shared() {
        let cfg: BalancerConfig = serde_json::from_str(
            r#"{"axes": [
                {"kp": 1.0, "ki": 0.0, "kd": 0.0},
                {"kp": 2.0, "ki": 0.0, "kd": 0.0},
                {"kp": 3.0, "ki": 0.0, "kd": 0.0}
            ]}"#,
        )
        .unwrap();
        assert_eq!(cfg.axis_gains()[2].kp, 3.0);
        let ctrl = cfg.per_axis_controller().unwrap();
        assert_eq!(ctrl.axis(crate::utils::Servo::Left).gains().kp, 2.0);
    }

    #[test]
    fn test_validation_failures() {
        let mut cfg = BalancerConfig::default();
        cfg.output = OutputLimits { min: 10.0, max: -10.0 };
        assert!(cfg.validate().is_err());

        let mut cfg = BalancerConfig::default();
        cfg.reference = Vector2::ZERO;
        assert!(cfg.planar_controller().is_err());

        let mut cfg = BalancerConfig::default();
        cfg.serial.baud_rate = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = BalancerConfig::default();
        cfg.serial.timeout_secs = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = BalancerConfig::default();
        cfg.gains.kd = f32::INFINITY;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidConfiguration(
                "PID gains must be finite and non-negative"
            ))
        );
    }
}
