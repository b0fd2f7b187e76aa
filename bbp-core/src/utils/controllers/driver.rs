//! Loop drivers: one against a real actuator, one against the simulated
//! platform.

use serde::{Deserialize, Serialize};

use crate::utils::{
    connection::ServoActuator,
    controllers::{
        observer::{NoopObserver, SampleObserver},
        Feedback, LoopState, PlatformController, Servo,
    },
    math::{
        kinematics::{BallSimulation, PlatformKinematics, Tilt},
        vector::Vector2,
    },
};

/// Result of one control iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Clamped actions `[top, left, right]`, before the servo offset.
    pub actions: [f32; 3],
    /// Servo commands that failed this tick.
    pub failures: usize,
}

/// Computes actions from feedback and sends them to the servos.
///
/// A failed servo command is logged and counted; the remaining servos are
/// still commanded and the loop keeps running.
pub struct ControlLoop<A, O = NoopObserver> {
    controller: PlatformController<O>,
    actuator: A,
    servo_offset: f32,
    ticks: u64,
    failed_sends: u64,
}

impl<A: ServoActuator, O: SampleObserver> ControlLoop<A, O> {
    pub fn new(
        controller: PlatformController<O>,
        actuator: A,
        servo_offset: f32,
    ) -> Self {
        Self {
            controller,
            actuator,
            servo_offset,
            ticks: 0,
            failed_sends: 0,
        }
    }

    pub fn tick(
        &mut self,
        feedback: &Feedback,
    ) -> TickReport {
        let actions = self.controller.compute(feedback);
        let mut failures = 0;
        for servo in Servo::ALL {
            let angle = actions[servo.index()] + self.servo_offset;
            if let Err(error) = self.actuator.set_angle(servo, angle) {
                failures += 1;
                tracing::warn!(?servo, angle, ?error, "servo command failed");
            }
        }
        self.ticks += 1;
        self.failed_sends += failures as u64;
        tracing::debug!(tick = self.ticks, ?actions, "control tick");
        TickReport { actions, failures }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Failed servo commands since construction.
    pub fn failed_sends(&self) -> u64 {
        self.failed_sends
    }

    pub fn servo_offset(&self) -> f32 {
        self.servo_offset
    }

    pub fn controller(&self) -> &PlatformController<O> {
        &self.controller
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    pub fn into_parts(self) -> (PlatformController<O>, A) {
        (self.controller, self.actuator)
    }
}

/// One simulated iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimStep {
    pub tilt: Tilt,
    pub position: Vector2,
    pub setpoint: Vector2,
    pub actions: [f32; 3],
}

/// Closed loop against the simulated platform, no hardware involved.
///
/// Each step tilts the platform with the previous actions, moves the ball
/// and then computes new actions from the new position.
pub struct Simulation<O = NoopObserver> {
    controller: PlatformController<O>,
    kinematics: PlatformKinematics,
    ball: BallSimulation,
    setpoint: Vector2,
    actions: [f32; 3],
}

impl<O: SampleObserver> Simulation<O> {
    pub fn new(
        controller: PlatformController<O>,
        kinematics: PlatformKinematics,
        start: Vector2,
        setpoint: Vector2,
    ) -> Self {
        Self {
            controller,
            kinematics,
            ball: BallSimulation::at(start),
            setpoint,
            actions: [0.0; 3],
        }
    }

    pub fn set_setpoint(
        &mut self,
        setpoint: Vector2,
    ) {
        self.setpoint = setpoint;
    }

    pub fn step(&mut self) -> SimStep {
        let tilt = self.kinematics.tilt(self.actions);
        let position = self.ball.step(tilt);
        self.actions = self.controller.compute(&Feedback::Planar(LoopState {
            position,
            setpoint: self.setpoint,
        }));
        SimStep {
            tilt,
            position,
            setpoint: self.setpoint,
            actions: self.actions,
        }
    }

    pub fn ball(&self) -> &BallSimulation {
        &self.ball
    }

    pub fn setpoint(&self) -> Vector2 {
        self.setpoint
    }

    /// Actions computed by the last step.
    pub fn actions(&self) -> [f32; 3] {
        self.actions
    }

    pub fn controller(&self) -> &PlatformController<O> {
        &self.controller
    }

    pub fn into_controller(self) -> PlatformController<O> {
        self.controller
    }
}
