// Heading arithmetic for in-place turns
// Headings are degrees in [-180, 180] as reported by the IMU.
// clamp_angle saturates at the boundary and never wraps; normalize_target wraps
// a target above 180 once, then clamps. They are not interchangeable.

use serde::{Deserialize, Serialize};

/// How the turn loop decides it has arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnTermination {
    /// Error is the shortest rotation between heading and target
    #[default]
    ShortestPath,
    /// Error is the raw signed difference, ignoring the ±180 seam
    Legacy,
}

/// Saturate to [-180, 180]
pub fn clamp_angle(degrees: f64) -> f64 {
    degrees.clamp(-180.0, 180.0)
}

/// Turn target preprocessing: one subtraction of 360 above 180, then clamp
pub fn normalize_target(degrees: f64) -> f64 {
    let wrapped = if degrees > 180.0 { degrees - 360.0 } else { degrees };
    clamp_angle(wrapped)
}

/// Map [-180, 180] to [0, 360)
pub fn to_unsigned(degrees: f64) -> f64 {
    if degrees < 0.0 { degrees + 360.0 } else { degrees }
}

/// Wrap any angle into (-180, 180]
pub fn wrap_degrees(degrees: f64) -> f64 {
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 { 180.0 } else { wrapped }
}

/// Signed shortest rotation from `target` to `current`
pub fn shortest_error(current: f64, target: f64) -> f64 {
    wrap_degrees(current - target)
}

/// +1 when heading should increase to reach the target the short way, -1 otherwise
pub fn turn_direction(current: f64, target: f64) -> f64 {
    let diff = to_unsigned(current) - to_unsigned(target);
    let increase = if diff.abs() > 180.0 { diff > 0.0 } else { diff <= 0.0 };
    if increase { 1.0 } else { -1.0 }
}

/// Geometry of one turn, computed once per call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnGeometry {
    pub target: f64,
    pub tolerance_half_width: f64,
    pub range_min: f64,
    pub range_max: f64,
    threshold: f64,
    termination: TurnTermination,
}

impl TurnGeometry {
    pub fn new(target_deg: f64, threshold_deg: f64, termination: TurnTermination) -> Self {
        let target = normalize_target(target_deg);
        let half = threshold_deg / 2.0;
        Self {
            target,
            tolerance_half_width: half,
            range_min: clamp_angle(target - half),
            range_max: clamp_angle(target + half),
            threshold: threshold_deg,
            termination,
        }
    }

    /// The IMU may report +180 for the same pose as -180; match the target's side
    pub fn adjust_heading(&self, heading: f64) -> f64 {
        if heading == 180.0 && self.target < 0.0 {
            -180.0
        } else {
            heading
        }
    }

    pub fn error(&self, heading: f64) -> f64 {
        match self.termination {
            TurnTermination::ShortestPath => shortest_error(heading, self.target),
            TurnTermination::Legacy => heading - self.target,
        }
    }

    pub fn is_within_tolerance(&self, heading: f64) -> bool {
        self.error(heading).abs() <= self.threshold
    }

    pub fn direction(&self, heading: f64) -> f64 {
        turn_direction(heading, self.target)
    }
}
