// Simulated mecanum drivetrain
// One shared world backs four SimWheel actuators and a SimImu, and also acts as
// the Clock. Time only moves when the controller sleeps.
//
// Wheel model:
// - closed-loop wheels move toward their target at |power| * max_ticks_per_sec
//   and stop exactly on it
// - open-loop wheels move at power * max_ticks_per_sec
// - heading integrates from the left/right power difference of open-loop wheels
//
// Readings are in the wheel's own (polarity-adjusted) frame.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::angle::wrap_degrees;
use super::ports::{
    ActuatorPort, Clock, Direction, HardwareError, HeadingSensor, Orientation, RunMode,
};
use super::wheels::{WheelRole, WheelSet};

/// Physical limits of the simulated robot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    /// Wheel speed at full power (ticks/s)
    pub max_ticks_per_sec: f64,
    /// Rotation rate with full differential power (deg/s)
    pub max_yaw_deg_per_sec: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            max_ticks_per_sec: 2700.0,
            max_yaw_deg_per_sec: 180.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct WheelModel {
    position: f64,
    target: i32,
    power: f64,
    velocity: f64,
    mode: RunMode,
    direction: Direction,
}

impl WheelModel {
    fn step(&mut self, dt: f64, max_speed: f64, blocked: bool) {
        if blocked {
            self.velocity = 0.0;
            return;
        }
        let previous = self.position;
        match self.mode {
            RunMode::OpenLoop => self.position += self.power * max_speed * dt,
            RunMode::ClosedLoopToPosition => {
                let error = self.target as f64 - self.position;
                let reach = self.power.abs() * max_speed * dt;
                if error.abs() <= reach {
                    self.position = self.target as f64;
                } else {
                    self.position += error.signum() * reach;
                }
            }
        }
        self.velocity = (self.position - previous) / dt;
    }
}

#[derive(Debug)]
struct WorldState {
    params: SimParams,
    now: Duration,
    wheels: WheelSet<WheelModel>,
    heading: f64,
    blocked: bool,
    imu_fault: bool,
    encoder_fault: Option<WheelRole>,
}

impl WorldState {
    fn step(&mut self, dt: Duration) {
        let secs = dt.as_secs_f64();
        if secs <= 0.0 {
            return;
        }
        self.now += dt;

        let max_speed = self.params.max_ticks_per_sec;
        for (_, wheel) in self.wheels.iter_mut() {
            wheel.step(secs, max_speed, self.blocked);
        }

        if !self.blocked {
            let spin = self.wheels.iter().fold(0.0, |acc, (role, wheel)| {
                let power = match wheel.mode {
                    RunMode::OpenLoop => wheel.power,
                    RunMode::ClosedLoopToPosition => 0.0,
                };
                if role.is_left() { acc + power } else { acc - power }
            });
            let yaw_rate = spin / 4.0 * self.params.max_yaw_deg_per_sec;
            self.heading = wrap_degrees(self.heading + yaw_rate * secs);
        }
    }
}

/// Shared simulated world; also the clock of the simulation
#[derive(Debug, Clone)]
pub struct SimWorld {
    state: Arc<Mutex<WorldState>>,
}

impl SimWorld {
    pub fn new(params: SimParams) -> Self {
        Self {
            state: Arc::new(Mutex::new(WorldState {
                params,
                now: Duration::ZERO,
                wheels: WheelSet::default(),
                heading: 0.0,
                blocked: false,
                imu_fault: false,
                encoder_fault: None,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, WorldState> {
        // A panicking test thread must not hide the world from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Actuator handles for all four wheels
    pub fn wheels(&self) -> WheelSet<SimWheel> {
        WheelSet::from_fn(|role| SimWheel {
            world: self.clone(),
            role,
        })
    }

    pub fn imu(&self) -> SimImu {
        SimImu {
            world: self.clone(),
        }
    }

    pub fn set_direction(&self, role: WheelRole, direction: Direction) {
        self.state().wheels[role].direction = direction;
    }

    /// Pin every wheel against an obstacle
    pub fn set_blocked(&self, blocked: bool) {
        self.state().blocked = blocked;
    }

    pub fn set_heading(&self, degrees: f64) {
        self.state().heading = wrap_degrees(degrees);
    }

    pub fn heading(&self) -> f64 {
        self.state().heading
    }

    pub fn set_imu_fault(&self, fault: bool) {
        self.state().imu_fault = fault;
    }

    /// Make one wheel's encoder reads fail
    pub fn set_encoder_fault(&self, role: Option<WheelRole>) {
        self.state().encoder_fault = role;
    }

    pub fn run_mode(&self, role: WheelRole) -> RunMode {
        self.state().wheels[role].mode
    }

    pub fn target(&self, role: WheelRole) -> i32 {
        self.state().wheels[role].target
    }

    pub fn power(&self, role: WheelRole) -> f64 {
        self.state().wheels[role].power
    }

    pub fn position(&self, role: WheelRole) -> i32 {
        self.state().wheels[role].position.round() as i32
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new(SimParams::default())
    }
}

impl Clock for SimWorld {
    fn now(&self) -> Duration {
        self.state().now
    }

    fn sleep(&self, duration: Duration) {
        self.state().step(duration);
    }
}

/// One simulated wheel motor
#[derive(Debug, Clone)]
pub struct SimWheel {
    world: SimWorld,
    role: WheelRole,
}

impl SimWheel {
    fn device(&self) -> String {
        self.role.label().to_lowercase()
    }

    fn with_wheel<T>(&self, f: impl FnOnce(&mut WheelModel) -> T) -> Result<T, HardwareError> {
        let mut state = self.world.state();
        if state.encoder_fault == Some(self.role) {
            return Err(HardwareError::Disconnected {
                device: self.device(),
            });
        }
        Ok(f(&mut state.wheels[self.role]))
    }
}

impl ActuatorPort for SimWheel {
    fn set_power(&mut self, power: f64) -> Result<(), HardwareError> {
        self.with_wheel(|wheel| wheel.power = power.clamp(-1.0, 1.0))
    }

    fn power(&mut self) -> Result<f64, HardwareError> {
        self.with_wheel(|wheel| wheel.power)
    }

    fn position(&mut self) -> Result<i32, HardwareError> {
        self.with_wheel(|wheel| wheel.position.round() as i32)
    }

    fn set_target_position(&mut self, ticks: i32) -> Result<(), HardwareError> {
        self.with_wheel(|wheel| wheel.target = ticks)
    }

    fn target_position(&mut self) -> Result<i32, HardwareError> {
        self.with_wheel(|wheel| wheel.target)
    }

    fn set_run_mode(&mut self, mode: RunMode) -> Result<(), HardwareError> {
        self.with_wheel(|wheel| wheel.mode = mode)
    }

    fn velocity(&mut self) -> Result<f64, HardwareError> {
        self.with_wheel(|wheel| wheel.velocity)
    }

    fn direction(&mut self) -> Result<Direction, HardwareError> {
        self.with_wheel(|wheel| wheel.direction)
    }

    fn reset_encoder(&mut self) -> Result<(), HardwareError> {
        self.with_wheel(|wheel| {
            wheel.position = 0.0;
            wheel.target = 0;
            wheel.velocity = 0.0;
        })
    }
}

/// Simulated IMU; heading is reported on the first axis
#[derive(Debug, Clone)]
pub struct SimImu {
    world: SimWorld,
}

impl HeadingSensor for SimImu {
    fn orientation(&mut self) -> Result<Orientation, HardwareError> {
        let state = self.world.state();
        if state.imu_fault {
            return Err(HardwareError::Timeout {
                device: "imu".to_string(),
            });
        }
        Ok(Orientation::new(state.heading, 0.0, 0.0))
    }
}
