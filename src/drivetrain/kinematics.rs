// Mecanum kinematics for a four-wheel base
// Converts distances to encoder targets and robot-centric power vectors to wheel powers.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::ports::Direction;
use super::wheels::{WheelRole, WheelSet};
use crate::error::{DriveError, Result};

/// Empirical mixing gains for this chassis' roller geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixingGains {
    /// Scales the strafe term on the front wheels
    pub front_strafe: f64,
    /// Scales the side term on the back wheels
    pub back_side: f64,
}

impl Default for MixingGains {
    fn default() -> Self {
        Self {
            front_strafe: 0.9,
            back_side: 0.6,
        }
    }
}

/// Direction of a pure lateral translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn multiplier(self) -> i32 {
        match self {
            Side::Left => 1,
            Side::Right => -1,
        }
    }
}

/// Convert a linear wheel travel distance to encoder ticks
///
/// The result is truncated toward zero, so the terminal position can fall
/// short of the exact distance by less than one tick.
pub fn ticks_for_distance(
    distance_cm: f64,
    wheel_radius_cm: f64,
    gear_ratio: f64,
    ticks_per_rev: f64,
) -> Result<i32> {
    let circumference = 2.0 * PI * wheel_radius_cm;
    let ticks = (distance_cm / circumference) * (ticks_per_rev * gear_ratio);

    if !ticks.is_finite() {
        return Err(DriveError::invalid(format!(
            "{} cm does not convert to a finite tick count",
            distance_cm
        )));
    }

    let ticks = ticks.trunc();
    if ticks < i32::MIN as f64 || ticks > i32::MAX as f64 {
        return Err(DriveError::invalid(format!(
            "{} cm overflows the encoder range ({} ticks)",
            distance_cm, ticks
        )));
    }
    Ok(ticks as i32)
}

/// Targets for a straight drive: every wheel moves `relative_ticks` against its polarity
pub fn drive_targets(
    relative_ticks: i32,
    current: &WheelSet<i32>,
    directions: &WheelSet<Direction>,
) -> Result<WheelSet<i32>> {
    WheelSet::try_from_fn(|role| {
        let offset = relative_ticks
            .checked_mul(directions[role].multiplier())
            .ok_or_else(|| overflow(role, relative_ticks))?;
        current[role]
            .checked_sub(offset)
            .ok_or_else(|| overflow(role, relative_ticks))
    })
}

/// Per-wheel sign for a left strafe; right is the mirror image
fn strafe_sign(role: WheelRole) -> i32 {
    match role {
        WheelRole::FrontLeft | WheelRole::BackRight => 1,
        WheelRole::FrontRight | WheelRole::BackLeft => -1,
    }
}

/// Targets for a pure lateral translation
///
/// Front-left and back-right turn one way, front-right and back-left the other.
pub fn strafe_targets(
    side: Side,
    relative_ticks: i32,
    current: &WheelSet<i32>,
    directions: &WheelSet<Direction>,
) -> Result<WheelSet<i32>> {
    WheelSet::try_from_fn(|role| {
        let sign = strafe_sign(role) * side.multiplier() * directions[role].multiplier();
        let offset = relative_ticks
            .checked_mul(sign)
            .ok_or_else(|| overflow(role, relative_ticks))?;
        current[role]
            .checked_add(offset)
            .ok_or_else(|| overflow(role, relative_ticks))
    })
}

fn overflow(role: WheelRole, relative_ticks: i32) -> DriveError {
    DriveError::invalid(format!(
        "{} target overflows for {} relative ticks",
        role.label(),
        relative_ticks
    ))
}

/// Mix a robot-centric (forward, side, strafe) vector into wheel powers
///
/// Values are not clamped; the caller decides how to saturate.
pub fn robot_centric_powers(forward: f64, side: f64, strafe: f64, gains: MixingGains) -> WheelSet<f64> {
    WheelSet {
        front_left: forward - side - gains.front_strafe * strafe,
        front_right: forward + side + gains.front_strafe * strafe,
        back_left: forward - gains.back_side * side + strafe,
        back_right: forward + gains.back_side * side - strafe,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RADIUS: f64 = 3.75;
    const RATIO: f64 = 20.0;
    const TICKS_PER_REV: f64 = 28.0;

    fn forward() -> WheelSet<Direction> {
        WheelSet::from_fn(|_| Direction::Forward)
    }

    #[test]
    fn test_zero_distance() {
        assert_eq!(ticks_for_distance(0.0, RADIUS, RATIO, TICKS_PER_REV).unwrap(), 0);
    }

    #[test]
    fn test_one_revolution() {
        // One wheel circumference is exactly one output revolution
        let circumference = 2.0 * PI * RADIUS;
        let ticks = ticks_for_distance(circumference, RADIUS, RATIO, TICKS_PER_REV).unwrap();
        assert!((559..=560).contains(&ticks), "got {}", ticks);
    }

    #[test]
    fn test_truncates_toward_zero() {
        // 10 cm -> 237.67 ticks
        assert_eq!(ticks_for_distance(10.0, RADIUS, RATIO, TICKS_PER_REV).unwrap(), 237);
        assert_eq!(ticks_for_distance(-10.0, RADIUS, RATIO, TICKS_PER_REV).unwrap(), -237);
    }

    #[test]
    fn test_ticks_monotonic() {
        let mut previous = i32::MIN;
        for cm in -200..=200 {
            let ticks = ticks_for_distance(cm as f64, RADIUS, RATIO, TICKS_PER_REV).unwrap();
            assert!(ticks >= previous, "{} cm gave {} after {}", cm, ticks, previous);
            previous = ticks;
        }
    }

    #[test]
    fn test_overflow_is_rejected() {
        let err = ticks_for_distance(1.0e12, RADIUS, RATIO, TICKS_PER_REV).unwrap_err();
        assert!(matches!(err, DriveError::InvalidMotionRequest(_)));
        let err = ticks_for_distance(f64::NAN, RADIUS, RATIO, TICKS_PER_REV).unwrap_err();
        assert!(matches!(err, DriveError::InvalidMotionRequest(_)));
    }

    #[test]
    fn test_drive_targets_follow_polarity() {
        let current = WheelSet::new(10, 0, -5, 0);
        let directions = WheelSet::new(
            Direction::Forward,
            Direction::Reversed,
            Direction::Reversed,
            Direction::Forward,
        );
        let targets = drive_targets(100, &current, &directions).unwrap();
        assert_eq!(targets, WheelSet::new(-90, 100, 95, -100));
    }

    #[test]
    fn test_drive_targets_overflow() {
        let current = WheelSet::new(i32::MIN + 1, 0, 0, 0);
        let err = drive_targets(10, &current, &forward()).unwrap_err();
        assert!(matches!(err, DriveError::InvalidMotionRequest(_)));
    }

    #[test]
    fn test_strafe_pattern() {
        let current = WheelSet::default();
        let left = strafe_targets(Side::Left, 300, &current, &forward()).unwrap();
        assert_eq!(left, WheelSet::new(300, -300, -300, 300));
    }

    #[test]
    fn test_strafe_sides_mirror() {
        let current = WheelSet::default();
        let directions = WheelSet::new(
            Direction::Forward,
            Direction::Reversed,
            Direction::Reversed,
            Direction::Forward,
        );
        for ticks in [1, 250, 4000] {
            let left = strafe_targets(Side::Left, ticks, &current, &directions).unwrap();
            let right = strafe_targets(Side::Right, ticks, &current, &directions).unwrap();
            for role in WheelRole::ALL {
                assert_eq!(left[role], -right[role], "{:?} at {} ticks", role, ticks);
            }
        }
    }

    #[test]
    fn test_pure_forward_powers() {
        let powers = robot_centric_powers(0.5, 0.0, 0.0, MixingGains::default());
        assert_eq!(powers, WheelSet::new(0.5, 0.5, 0.5, 0.5));
    }

    #[test]
    fn test_mixing_gains_apply() {
        let gains = MixingGains::default();
        let powers = robot_centric_powers(0.0, 0.0, 1.0, gains);
        assert!((powers.front_left + 0.9).abs() < 1e-12);
        assert!((powers.front_right - 0.9).abs() < 1e-12);
        assert_eq!(powers.back_left, 1.0);
        assert_eq!(powers.back_right, -1.0);

        let powers = robot_centric_powers(0.0, 1.0, 0.0, gains);
        assert_eq!(powers.front_left, -1.0);
        assert_eq!(powers.front_right, 1.0);
        assert!((powers.back_left + 0.6).abs() < 1e-12);
        assert!((powers.back_right - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_custom_gains() {
        let gains = MixingGains {
            front_strafe: 1.0,
            back_side: 1.0,
        };
        let powers = robot_centric_powers(0.2, 0.3, 0.1, gains);
        assert!((powers.front_left - (0.2 - 0.3 - 0.1)).abs() < 1e-12);
        assert!((powers.back_right - (0.2 + 0.3 - 0.1)).abs() < 1e-12);
    }
}
