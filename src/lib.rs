// Mecanum drivetrain runtime
//
// - drivetrain: kinematics, stall detection and the motion controller
// - homing: background homing task for auxiliary actuators
// - runtime: Zenoh command loop that feeds the controller

pub mod config;
pub mod drivetrain;
pub mod error;
pub mod homing;
pub mod messages;
pub mod runtime;

pub use error::{DriveError, Result};
