// Background homing for auxiliary actuators (arm, lift...)
//
// Runs on its own thread while the drivetrain keeps executing motions. The
// task owns its actuator and limit switch, which must not be drivetrain wheels.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::drivetrain::{ActuatorPort, HardwareError, RunMode};

/// Touch sensor / limit switch marking the home position
pub trait LimitSwitch {
    fn is_pressed(&mut self) -> Result<bool, HardwareError>;
}

/// How a homing run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingOutcome {
    /// Switch pressed; encoder zeroed
    Homed,
    /// Gave up before the switch was pressed; power released, encoder untouched
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomingConfig {
    /// Power applied while searching for the switch
    pub power: f64,
    /// Delay between switch polls
    pub poll_interval: Duration,
    pub timeout: Option<Duration>,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            power: 1.0,
            poll_interval: Duration::from_millis(5),
            timeout: None,
        }
    }
}

/// Drive `actuator` toward home until `switch` is pressed, then zero it
pub fn home<A, S>(
    actuator: &mut A,
    switch: &mut S,
    config: HomingConfig,
) -> Result<HomingOutcome, HardwareError>
where
    A: ActuatorPort,
    S: LimitSwitch,
{
    let started = Instant::now();
    actuator.set_target_position(0)?;
    actuator.set_run_mode(RunMode::ClosedLoopToPosition)?;

    while !switch.is_pressed()? {
        if config.timeout.is_some_and(|limit| started.elapsed() >= limit) {
            warn!("Homing timed out after {:?}", started.elapsed());
            actuator.set_power(0.0)?;
            return Ok(HomingOutcome::TimedOut);
        }
        actuator.set_power(config.power)?;
        thread::sleep(config.poll_interval);
    }

    actuator.reset_encoder()?;
    actuator.set_power(0.0)?;
    info!("Homed in {:?}", started.elapsed());
    Ok(HomingOutcome::Homed)
}

/// Fire-and-forget homing; the handle gives the actuator and switch back
pub fn spawn_homing<A, S>(
    mut actuator: A,
    mut switch: S,
    config: HomingConfig,
) -> JoinHandle<Result<(A, S, HomingOutcome), HardwareError>>
where
    A: ActuatorPort + Send + 'static,
    S: LimitSwitch + Send + 'static,
{
    thread::spawn(move || {
        let outcome = home(&mut actuator, &mut switch, config)?;
        Ok((actuator, switch, outcome))
    })
}
