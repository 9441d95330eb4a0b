// Motion controller for the mecanum base
//
// Executes one motion at a time, blocking until the target is reached, a
// stall is detected, or the optional timeout expires. Every closed-loop
// motion ends by latching the wheels in place with `hold`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::angle::TurnGeometry;
use super::diagnostics::{Diagnostics, TracingDiagnostics};
use super::kinematics::{self, Side};
use super::ports::{ActuatorPort, Axis, Clock, Direction, HeadingSensor, RunMode};
use super::stall::{StallDetector, StallSample};
use super::wheels::WheelSet;
use crate::config::DriveConfig;
use crate::error::{DriveError, Result};
use crate::messages::MotionRequest;

/// How a motion command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionOutcome {
    /// Target reached, or a one-shot command applied
    Reached,
    /// Aborted because the wheels stopped moving under power
    Stalled,
    /// Aborted because `motion_timeout_ms` elapsed
    TimedOut,
}

/// Drivetrain controller owning four wheel actuators and a heading sensor
pub struct DriveTrainController<A, H, C> {
    wheels: WheelSet<A>,
    imu: H,
    clock: C,
    config: DriveConfig,
    stall: StallDetector,
    diagnostics: Box<dyn Diagnostics + Send>,
    last_outcome: Option<MotionOutcome>,
}

impl<A, H, C> DriveTrainController<A, H, C>
where
    A: ActuatorPort,
    H: HeadingSensor,
    C: Clock,
{
    /// Create a controller and zero all wheel encoders
    pub fn new(wheels: WheelSet<A>, imu: H, clock: C, config: DriveConfig) -> Result<Self> {
        info!(
            "Drivetrain: wheel radius {} cm, gear ratio {}, {} ticks/rev",
            config.wheel_radius_cm, config.gear_ratio, config.encoder_ticks_per_rev
        );
        let mut controller = Self {
            wheels,
            imu,
            clock,
            stall: StallDetector::new(config.stall),
            config,
            diagnostics: Box::new(TracingDiagnostics::default()),
            last_outcome: None,
        };
        controller.reset_encoders()?;
        Ok(controller)
    }

    /// Replace the telemetry sink
    pub fn with_diagnostics(mut self, diagnostics: impl Diagnostics + Send + 'static) -> Self {
        self.diagnostics = Box::new(diagnostics);
        self
    }

    /// Time source the motions are paced by
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Outcome of the most recent drive, strafe or turn
    pub fn last_outcome(&self) -> Option<MotionOutcome> {
        self.last_outcome
    }

    /// Run one request to completion
    pub fn execute(&mut self, request: &MotionRequest) -> Result<MotionOutcome> {
        match *request {
            MotionRequest::Drive { distance_cm, power } => self.drive_cm(distance_cm, power),
            MotionRequest::Strafe {
                side,
                distance_cm,
                power,
            } => self.strafe_cm(side, distance_cm, power),
            MotionRequest::Turn {
                target_deg,
                power,
                axis,
            } => {
                let axis = Axis::try_from(axis)?;
                self.turn(target_deg, power, axis)
            }
            MotionRequest::RobotCentric {
                forward,
                side,
                rotate,
            } => {
                self.drive_robot_centric(forward, side, rotate)?;
                Ok(MotionOutcome::Reached)
            }
        }
    }

    /// Drive straight by a distance in centimeters (negative drives backwards)
    pub fn drive_cm(&mut self, distance_cm: f64, power: f64) -> Result<MotionOutcome> {
        let ticks = self.ticks_for(distance_cm)?;
        self.drive(ticks, power)
    }

    /// Strafe sideways by a distance in centimeters
    pub fn strafe_cm(&mut self, side: Side, distance_cm: f64, power: f64) -> Result<MotionOutcome> {
        let ticks = self.ticks_for(distance_cm)?;
        self.strafe(side, ticks, power)
    }

    /// Drive straight by a number of encoder ticks
    pub fn drive(&mut self, relative_ticks: i32, power: f64) -> Result<MotionOutcome> {
        validate_power(power)?;
        info!("Drive {} ticks at power {}", relative_ticks, power);

        self.prepare_closed_loop()?;
        let current = self.positions()?;
        let directions = self.directions()?;
        let targets = kinematics::drive_targets(relative_ticks, &current, &directions)?;
        self.run_to_targets(targets, power)
    }

    /// Strafe sideways by a number of encoder ticks
    pub fn strafe(&mut self, side: Side, relative_ticks: i32, power: f64) -> Result<MotionOutcome> {
        validate_power(power)?;
        info!("Strafe {:?} {} ticks at power {}", side, relative_ticks, power);

        self.prepare_closed_loop()?;
        let current = self.positions()?;
        let directions = self.directions()?;
        let targets = kinematics::strafe_targets(side, relative_ticks, &current, &directions)?;
        self.run_to_targets(targets, power)
    }

    /// Rotate in place to an absolute heading read from `axis`
    ///
    /// Only the magnitude of `power` is used; the heading error picks the direction.
    pub fn turn(&mut self, target_deg: f64, power: f64, axis: Axis) -> Result<MotionOutcome> {
        validate_power(power)?;
        if !target_deg.is_finite() {
            return Err(DriveError::invalid(format!(
                "turn target {} is not a finite angle",
                target_deg
            )));
        }

        self.release()?;
        self.reset_encoders()?;
        self.set_run_mode(RunMode::OpenLoop)?;

        let geometry = TurnGeometry::new(
            target_deg,
            self.config.turn_threshold_deg,
            self.config.turn_termination,
        );
        info!(
            "Turn to {}° (requested {}°) on {:?} at power {}",
            geometry.target, target_deg, axis, power
        );

        let started = self.clock.now();
        let outcome = loop {
            let raw = self.imu.orientation()?.angle(axis);
            let heading = geometry.adjust_heading(raw);

            if geometry.is_within_tolerance(heading) {
                break MotionOutcome::Reached;
            }
            if self.timed_out(started) {
                warn!("Turn timed out at {}° (target {}°)", heading, geometry.target);
                break MotionOutcome::TimedOut;
            }

            let direction = geometry.direction(heading);
            self.diagnostics.add_data(format!(
                "Tar: {} / Curr: {} / Diff: {}",
                geometry.target,
                heading,
                geometry.target - heading
            ));
            self.diagnostics.add_data(format!("Dir: {}", direction));
            self.diagnostics
                .add_data(format!("Range Min: {}", geometry.range_min));
            self.diagnostics
                .add_data(format!("Range Max: {}", geometry.range_max));

            let left_power = power.abs() * direction;
            for (role, wheel) in self.wheels.iter_mut() {
                let wheel_power = if role.is_left() { left_power } else { -left_power };
                wheel.set_power(wheel_power)?;
            }
            self.diagnostics.update();
            self.clock.sleep(self.config.poll_interval());
        };

        self.finish(outcome)
    }

    /// Apply a robot-centric power vector once, open-loop
    ///
    /// No target and no termination: callers re-issue it every control tick.
    pub fn drive_robot_centric(&mut self, forward: f64, side: f64, strafe: f64) -> Result<()> {
        if !(forward.is_finite() && side.is_finite() && strafe.is_finite()) {
            return Err(DriveError::invalid("robot-centric powers must be finite"));
        }
        let powers = kinematics::robot_centric_powers(forward, side, strafe, self.config.mixing);
        for (role, wheel) in self.wheels.iter_mut() {
            wheel.set_run_mode(RunMode::OpenLoop)?;
            wheel.set_power(powers[role].clamp(-1.0, 1.0))?;
        }
        Ok(())
    }

    /// Latch every wheel at its current position under full closed-loop power
    pub fn hold(&mut self) -> Result<()> {
        for (_, wheel) in self.wheels.iter_mut() {
            let position = wheel.position()?;
            wheel.set_target_position(position)?;
            wheel.set_run_mode(RunMode::ClosedLoopToPosition)?;
            wheel.set_power(1.0)?;
        }
        Ok(())
    }

    /// Cut power so the wheels coast
    pub fn release(&mut self) -> Result<()> {
        for (_, wheel) in self.wheels.iter_mut() {
            wheel.set_power(0.0)?;
        }
        Ok(())
    }

    pub fn reset_encoders(&mut self) -> Result<()> {
        for (_, wheel) in self.wheels.iter_mut() {
            wheel.reset_encoder()?;
        }
        Ok(())
    }

    pub fn reset_stall_detector(&mut self) {
        self.stall.reset();
    }

    /// Poll the stall detector with the current wheel readings
    pub fn is_stalled(&mut self) -> Result<bool> {
        let readings = WheelSet::try_from_fn(|role| {
            let wheel = &mut self.wheels[role];
            Ok::<_, DriveError>((wheel.velocity()?, wheel.power()?))
        })?;
        let sample = StallSample::from_readings(readings.into_array());

        self.diagnostics
            .add_data(format!("Velocity: {}", sample.average_velocity));
        self.diagnostics.add_data(format!(
            "Last velocity: {}",
            self.stall.last_average_velocity()
        ));

        Ok(self.stall.poll(self.clock.now(), sample))
    }

    fn ticks_for(&self, distance_cm: f64) -> Result<i32> {
        kinematics::ticks_for_distance(
            distance_cm,
            self.config.wheel_radius_cm,
            self.config.gear_ratio,
            self.config.encoder_ticks_per_rev,
        )
    }

    fn positions(&mut self) -> Result<WheelSet<i32>> {
        WheelSet::try_from_fn(|role| self.wheels[role].position().map_err(DriveError::from))
    }

    fn directions(&mut self) -> Result<WheelSet<Direction>> {
        WheelSet::try_from_fn(|role| self.wheels[role].direction().map_err(DriveError::from))
    }

    fn set_run_mode(&mut self, mode: RunMode) -> Result<()> {
        for (_, wheel) in self.wheels.iter_mut() {
            wheel.set_run_mode(mode)?;
        }
        Ok(())
    }

    /// Common start of drive and strafe
    fn prepare_closed_loop(&mut self) -> Result<()> {
        self.stall.reset();
        self.release()?;
        self.reset_encoders()?;
        self.set_run_mode(RunMode::ClosedLoopToPosition)
    }

    fn timed_out(&self, started: Duration) -> bool {
        self.config
            .motion_timeout()
            .is_some_and(|limit| self.clock.now().saturating_sub(started) >= limit)
    }

    /// Command targets, then poll until every wheel has covered its distance
    fn run_to_targets(&mut self, targets: WheelSet<i32>, power: f64) -> Result<MotionOutcome> {
        for (role, wheel) in self.wheels.iter_mut() {
            wheel.set_target_position(targets[role])?;
            wheel.set_run_mode(RunMode::ClosedLoopToPosition)?;
            wheel.set_power(power)?;
        }
        debug!("Wheel targets: {:?}", targets);

        let started = self.clock.now();
        let outcome = loop {
            let positions = self.positions()?;
            let pending = positions
                .iter()
                .any(|(role, position)| position.unsigned_abs() < targets[role].unsigned_abs());

            if !pending {
                break MotionOutcome::Reached;
            }
            if self.is_stalled()? {
                warn!("Drivetrain stalled at {:?} (targets {:?})", positions, targets);
                break MotionOutcome::Stalled;
            }
            if self.timed_out(started) {
                warn!("Motion timed out at {:?} (targets {:?})", positions, targets);
                break MotionOutcome::TimedOut;
            }

            for (role, wheel) in self.wheels.iter_mut() {
                let target = wheel.target_position()?;
                self.diagnostics
                    .add_data(format!("{}: {} / {}", role.label(), positions[role], target));
            }
            self.diagnostics.update();
            self.clock.sleep(self.config.poll_interval());
        };

        self.finish(outcome)
    }

    fn finish(&mut self, outcome: MotionOutcome) -> Result<MotionOutcome> {
        self.hold()?;
        self.last_outcome = Some(outcome);
        info!("Motion finished: {:?}", outcome);
        Ok(outcome)
    }
}

fn validate_power(power: f64) -> Result<()> {
    if power.is_finite() && (-1.0..=1.0).contains(&power) {
        Ok(())
    } else {
        Err(DriveError::invalid(format!(
            "power {} is outside [-1, 1]",
            power
        )))
    }
}
