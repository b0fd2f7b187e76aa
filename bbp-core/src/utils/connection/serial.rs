//! Serial servo link.
//!
//! Each command is the target angle as ASCII decimal text terminated by a
//! newline, e.g. `"90.00000\n"`. The microcontroller may answer every command
//! with one line of text. The three servos share the link and are told apart
//! only by command order (Top, Left, Right).
//!
//! The link is generic over blocking `embedded_io` streams; on a host wrap a
//! `serialport` handle with `embedded_io_adapters::std::FromStd`.

use core::fmt::Write as _;

use embedded_io::{Error as _, ErrorKind, Read, Write};
use heapless::{String, Vec};

use crate::utils::{
    connection::{ActuatorError, ServoActuator},
    controllers::Servo,
};

/// Longest acknowledgement line kept, excluding the terminator.
pub const ACK_CAPACITY: usize = 64;
/// Fraction digits sent per angle.
const ANGLE_PRECISION: usize = 5;
const COMMAND_CAPACITY: usize = 64;

/// Servo commands over a serial stream.
pub struct SerialServo<P> {
    port: P,
    wait_for_ack: bool,
    last_ack: Option<String<ACK_CAPACITY>>,
}

impl<P: Read + Write> SerialServo<P> {
    /// Wrap an open port. With `wait_for_ack` every command blocks until one
    /// line is read back (or the port's read timeout expires).
    pub fn new(
        port: P,
        wait_for_ack: bool,
    ) -> Self {
        Self {
            port,
            wait_for_ack,
            last_ack: None,
        }
    }

    /// Encode one angle command.
    pub fn format_command(angle: f32) -> Result<String<COMMAND_CAPACITY>, ActuatorError> {
        if !angle.is_finite() {
            return Err(ActuatorError::InvalidAngle);
        }
        let mut cmd = String::new();
        writeln!(cmd, "{:.*}", ANGLE_PRECISION, angle).map_err(|_| ActuatorError::InvalidAngle)?;
        Ok(cmd)
    }

    /// Write one angle and, if enabled, read the acknowledgement line.
    pub fn send(
        &mut self,
        angle: f32,
    ) -> Result<(), ActuatorError> {
        let cmd = Self::format_command(angle)?;
        self.port
            .write_all(cmd.as_bytes())
            .map_err(|e| write_error(e.kind()))?;
        self.port.flush().map_err(|e| write_error(e.kind()))?;

        if self.wait_for_ack {
            let ack = self.read_line()?;
            tracing::debug!(ack = ack.as_str(), "servo acknowledged");
            self.last_ack = Some(ack);
        }
        Ok(())
    }

    /// Read one line. An over-long line is still consumed up to its
    /// terminator so the next acknowledgement starts on a fresh line.
    fn read_line(&mut self) -> Result<String<ACK_CAPACITY>, ActuatorError> {
        let mut line: Vec<u8, ACK_CAPACITY> = Vec::new();
        let mut overflow = false;
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => return Err(ActuatorError::PortUnavailable),
                Ok(_) => match byte[0] {
                    b'\n' => break,
                    b'\r' => continue,
                    b => overflow |= line.push(b).is_err(),
                },
                Err(e) => return Err(read_error(e.kind())),
            }
        }
        if overflow {
            return Err(ActuatorError::MalformedAck);
        }
        String::from_utf8(line).map_err(|_| ActuatorError::MalformedAck)
    }

    /// Most recent acknowledgement line, if any was read.
    pub fn last_ack(&self) -> Option<&str> {
        self.last_ack.as_deref()
    }

    pub fn waits_for_ack(&self) -> bool {
        self.wait_for_ack
    }

    pub fn into_inner(self) -> P {
        self.port
    }
}

impl<P: Read + Write> ServoActuator for SerialServo<P> {
    type Error = ActuatorError;

    fn set_angle(
        &mut self,
        servo: Servo,
        angle: f32,
    ) -> Result<(), ActuatorError> {
        tracing::trace!(?servo, angle, "serial servo command");
        self.send(angle)
    }
}

fn write_error(kind: ErrorKind) -> ActuatorError {
    match kind {
        ErrorKind::TimedOut => ActuatorError::WriteTimeout,
        _ => ActuatorError::PortUnavailable,
    }
}

fn read_error(kind: ErrorKind) -> ActuatorError {
    match kind {
        ErrorKind::TimedOut => ActuatorError::ReadTimeout,
        ErrorKind::InvalidData => ActuatorError::MalformedAck,
        _ => ActuatorError::PortUnavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{collections::VecDeque, vec::Vec as StdVec};

    /// In-memory port: records writes, replays scripted reply bytes and
    /// reports a timeout once they run out.
    #[derive(Default)]
    struct ScriptedPort {
        written: StdVec<u8>,
        replies: VecDeque<u8>,
        write_failure: Option<ErrorKind>,
        closed: bool,
    }

    impl ScriptedPort {
        fn replying(text: &str) -> Self {
            Self {
                replies: text.bytes().collect(),
                ..Default::default()
            }
        }
    }

    impl embedded_io::ErrorType for ScriptedPort {
        type Error = ErrorKind;
    }

    impl Read for ScriptedPort {
        fn read(
            &mut self,
            buf: &mut [u8],
        ) -> Result<usize, ErrorKind> {
            if self.closed {
                return Ok(0);
            }
            match self.replies.pop_front() {
                Some(b) => {
                    buf[0] = b;
                    Ok(1)
                }
                None => Err(ErrorKind::TimedOut),
            }
        }
    }

    impl Write for ScriptedPort {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> Result<usize, ErrorKind> {
            if let Some(kind) = self.write_failure {
                return Err(kind);
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), ErrorKind> {
            Ok(())
        }
    }

    #[test]
    fn test_command_format() {
        type Link = SerialServo<ScriptedPort>;
        assert_eq!(Link::format_command(45.0).unwrap().as_str(), "45.00000\n");
        assert_eq!(Link::format_command(-3.25).unwrap().as_str(), "-3.25000\n");
        assert_eq!(Link::format_command(f32::NAN), Err(ActuatorError::InvalidAngle));
    }

    #[test]
    fn test_send_without_ack() {
        let mut servo = SerialServo::new(ScriptedPort::default(), false);
        servo.set_angle(Servo::Top, 90.0).unwrap();
        servo.set_angle(Servo::Left, 12.5).unwrap();
        assert!(servo.last_ack().is_none());
        assert_eq!(servo.into_inner().written, b"90.00000\n12.50000\n");
    }

    #[test]
    fn test_send_reads_ack_line() {
        let mut servo = SerialServo::new(ScriptedPort::replying("ok 90\r\nok 45\n"), true);
        servo.set_angle(Servo::Top, 90.0).unwrap();
        assert_eq!(servo.last_ack(), Some("ok 90"));
        servo.set_angle(Servo::Left, 45.0).unwrap();
        assert_eq!(servo.last_ack(), Some("ok 45"));
    }

    #[test]
    fn test_missing_ack_times_out() {
        let mut servo = SerialServo::new(ScriptedPort::default(), true);
        assert_eq!(servo.set_angle(Servo::Top, 1.0), Err(ActuatorError::ReadTimeout));
        // The command itself still went out.
        assert_eq!(servo.into_inner().written, b"1.00000\n");
    }

    #[test]
    fn test_write_errors_map_to_actuator_errors() {
        let mut servo = SerialServo::new(
            ScriptedPort {
                write_failure: Some(ErrorKind::TimedOut),
                ..Default::default()
            },
            false,
        );
        assert_eq!(servo.send(1.0), Err(ActuatorError::WriteTimeout));

        let mut servo = SerialServo::new(
            ScriptedPort {
                write_failure: Some(ErrorKind::NotConnected),
                ..Default::default()
            },
            false,
        );
        assert_eq!(servo.send(1.0), Err(ActuatorError::PortUnavailable));
    }

    #[test]
    fn test_closed_port_is_unavailable() {
        let mut servo = SerialServo::new(
            ScriptedPort {
                closed: true,
                ..Default::default()
            },
            true,
        );
        assert_eq!(servo.send(1.0), Err(ActuatorError::PortUnavailable));
    }

    #[test]
    fn test_bad_ack_is_malformed() {
        let mut servo = SerialServo::new(ScriptedPort::replying("\u{0}\u{0}"), true);
        // Valid UTF-8 but unterminated: runs into the timeout.
        assert_eq!(servo.send(1.0), Err(ActuatorError::ReadTimeout));

        let mut port = ScriptedPort::default();
        port.replies.extend([0xff, 0xfe, b'\n']);
        let mut servo = SerialServo::new(port, true);
        assert_eq!(servo.send(1.0), Err(ActuatorError::MalformedAck));

        let long: alloc::string::String = core::iter::repeat('x').take(ACK_CAPACITY + 1).collect();
        let mut servo = SerialServo::new(ScriptedPort::replying(&long), true);
        // Over-long and unterminated: drained until the timeout.
        assert_eq!(servo.send(1.0), Err(ActuatorError::ReadTimeout));
    }

    #[test]
    fn test_bad_ack_does_not_desync_next_ack() {
        let mut long: alloc::string::String =
            core::iter::repeat('x').take(ACK_CAPACITY + 6).collect();
        long.push_str("TAIL\nok 2\n");
        let mut servo = SerialServo::new(ScriptedPort::replying(&long), true);
        assert_eq!(servo.send(1.0), Err(ActuatorError::MalformedAck));
        servo.send(2.0).unwrap();
        assert_eq!(servo.last_ack(), Some("ok 2"));

        let mut port = ScriptedPort::default();
        port.replies.extend(b"\xff\xfe tail\nok 3\n");
        let mut servo = SerialServo::new(port, true);
        assert_eq!(servo.send(1.0), Err(ActuatorError::MalformedAck));
        servo.send(3.0).unwrap();
        assert_eq!(servo.last_ack(), Some("ok 3"));
    }
}
