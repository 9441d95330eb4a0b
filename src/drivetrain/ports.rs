// Capability interfaces the controller drives
//
// Implemented by the hardware layer (outside this crate) and by the simulator.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::DriveError;

/// Failure reported by an actuator or sensor
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HardwareError {
    #[error("Device {device} is disconnected")]
    Disconnected { device: String },

    #[error("Timeout waiting for response from {device}")]
    Timeout { device: String },

    #[error("Device {device} reported a fault: {reason}")]
    Fault { device: String, reason: String },
}

/// Actuator operating modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Commanded power passes straight through
    #[default]
    OpenLoop,
    /// The actuator drives itself toward its target position
    ClosedLoopToPosition,
}

/// Mounting polarity of a wheel motor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reversed,
}

impl Direction {
    /// Sign applied to position and velocity readings
    pub fn multiplier(self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Reversed => -1,
        }
    }
}

/// One wheel motor with an encoder
pub trait ActuatorPort {
    /// Set commanded power in [-1, 1]
    fn set_power(&mut self, power: f64) -> Result<(), HardwareError>;
    fn power(&mut self) -> Result<f64, HardwareError>;
    /// Encoder position in ticks since the last reset
    fn position(&mut self) -> Result<i32, HardwareError>;
    fn set_target_position(&mut self, ticks: i32) -> Result<(), HardwareError>;
    fn target_position(&mut self) -> Result<i32, HardwareError>;
    fn set_run_mode(&mut self, mode: RunMode) -> Result<(), HardwareError>;
    /// Encoder velocity in ticks per second
    fn velocity(&mut self) -> Result<f64, HardwareError>;
    fn direction(&mut self) -> Result<Direction, HardwareError>;
    fn reset_encoder(&mut self) -> Result<(), HardwareError>;
}

/// Orientation reading in degrees, one angle per sensor axis
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation {
    pub first: f64,
    pub second: f64,
    pub third: f64,
}

impl Orientation {
    pub fn new(first: f64, second: f64, third: f64) -> Self {
        Self {
            first,
            second,
            third,
        }
    }

    pub fn angle(&self, axis: Axis) -> f64 {
        match axis {
            Axis::First => self.first,
            Axis::Second => self.second,
            Axis::Third => self.third,
        }
    }
}

/// Absolute orientation sensor (IMU)
pub trait HeadingSensor {
    fn orientation(&mut self) -> Result<Orientation, HardwareError>;
}

/// Orientation axis used as heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    #[default]
    First,
    Second,
    Third,
}

/// Axes are numbered 1..=3 on the wire; anything else is rejected
impl TryFrom<u8> for Axis {
    type Error = DriveError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            1 => Ok(Axis::First),
            2 => Ok(Axis::Second),
            3 => Ok(Axis::Third),
            other => Err(DriveError::invalid(format!(
                "orientation axis {} is not one of 1, 2, 3",
                other
            ))),
        }
    }
}

/// Time source for polling loops
///
/// `sleep` is how a loop yields between iterations, so a simulated clock can
/// advance its world in lockstep with the controller.
pub trait Clock {
    /// Monotonic time since an arbitrary origin
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_from_index() {
        assert_eq!(Axis::try_from(1).unwrap(), Axis::First);
        assert_eq!(Axis::try_from(2).unwrap(), Axis::Second);
        assert_eq!(Axis::try_from(3).unwrap(), Axis::Third);
    }

    #[test]
    fn test_axis_rejects_unknown_index() {
        for index in [0u8, 4, 255] {
            let err = Axis::try_from(index).unwrap_err();
            assert!(matches!(err, DriveError::InvalidMotionRequest(_)));
        }
    }

    #[test]
    fn test_orientation_axis_selection() {
        let orientation = Orientation::new(10.0, 20.0, 30.0);
        assert_eq!(orientation.angle(Axis::First), 10.0);
        assert_eq!(orientation.angle(Axis::Second), 20.0);
        assert_eq!(orientation.angle(Axis::Third), 30.0);
    }

    #[test]
    fn test_direction_multiplier() {
        assert_eq!(Direction::Forward.multiplier(), 1);
        assert_eq!(Direction::Reversed.multiplier(), -1);
    }

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let before = clock.now();
        clock.sleep(Duration::from_millis(2));
        assert!(clock.now() >= before + Duration::from_millis(2));
    }
}
