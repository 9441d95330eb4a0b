// Drivetrain control for a four-wheel mecanum base
//
// Provides:
// - Capability traits for wheel actuators, heading sensor and clock
// - Mecanum kinematics (distance -> ticks, wheel targets, power mixing)
// - Velocity stall detection
// - The motion controller (drive, strafe, turn, hold, release)
// - A deterministic simulator implementing the capability traits

pub mod angle;
mod controller;
pub mod diagnostics;
pub mod kinematics;
mod ports;
pub mod sim;
pub mod stall;
mod wheels;

pub use angle::{TurnGeometry, TurnTermination};
pub use controller::{DriveTrainController, MotionOutcome};
pub use diagnostics::{Diagnostics, NullDiagnostics, TracingDiagnostics};
pub use kinematics::{MixingGains, Side};
pub use ports::{
    ActuatorPort, Axis, Clock, Direction, HardwareError, HeadingSensor, MonotonicClock,
    Orientation, RunMode,
};
pub use stall::{StallDetector, StallSample};
pub use wheels::{WheelRole, WheelSet};
