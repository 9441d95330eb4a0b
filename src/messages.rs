// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::drivetrain::{MotionOutcome, Side};

// Command from scripts/teleop -> runtime
// Tagged by "type" so each variant carries only its own fields, e.g.
// {"type": "turn", "target_deg": 90.0, "power": 0.1, "axis": 1}
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionRequest {
    Drive {
        distance_cm: f64,
        power: f64,
    },
    Strafe {
        side: Side,
        distance_cm: f64,
        power: f64,
    },
    Turn {
        target_deg: f64,
        power: f64,
        /// Orientation axis index, 1..=3
        axis: u8,
    },
    RobotCentric {
        forward: f64,
        side: f64,
        rotate: f64,
    },
}

impl MotionRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            MotionRequest::Drive { .. } => "drive",
            MotionRequest::Strafe { .. } => "strafe",
            MotionRequest::Turn { .. } => "turn",
            MotionRequest::RobotCentric { .. } => "robot_centric",
        }
    }

    /// Robot-centric requests are re-applied every tick rather than run to completion
    pub fn is_continuous(&self) -> bool {
        matches!(self, MotionRequest::RobotCentric { .. })
    }
}

/// Published by the runtime after each discrete motion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionReport {
    pub kind: String,
    /// `None` when the request failed; see `error`
    pub outcome: Option<MotionOutcome>,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    Fault,
}
