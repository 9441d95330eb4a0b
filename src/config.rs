// Timeouts, topics, drivetrain tuning
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::drivetrain::{MixingGains, TurnTermination};

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Command timeout for watchdog (robot-centric commands only)
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_MOTION: &str = "mecanum/cmd/motion"; // motion requests
pub const TOPIC_REPORT: &str = "mecanum/state/report"; // motion outcomes
pub const TOPIC_HEALTH: &str = "mecanum/state/health"; // health status

/// Errors raised while loading a [`DriveConfig`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Stall detector tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StallConfig {
    /// Length of one sampling window in milliseconds
    pub window_ms: u64,
    /// Average wheel speed (ticks/s) below which a motionless window counts as stalled
    pub low_speed_threshold: f64,
}

impl Default for StallConfig {
    fn default() -> Self {
        Self {
            window_ms: 1000,
            low_speed_threshold: 15.0,
        }
    }
}

impl StallConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Physical and control parameters of the drivetrain.
///
/// Distances are in centimeters, angles in degrees, encoder values in ticks.
/// Every field has a default matching the competition robot, so a JSON file
/// only needs to list what differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Wheel radius (cm)
    pub wheel_radius_cm: f64,
    /// Gearbox reduction between motor and wheel
    pub gear_ratio: f64,
    /// Encoder ticks per motor revolution, before gearing
    pub encoder_ticks_per_rev: f64,
    /// Allowed heading error when turning (deg)
    pub turn_threshold_deg: f64,
    /// How the turn loop measures heading error
    pub turn_termination: TurnTermination,
    /// Robot-centric mixing gains
    pub mixing: MixingGains,
    pub stall: StallConfig,
    /// Delay between polling iterations (ms); 0 spins
    pub poll_interval_ms: u64,
    /// Optional upper bound on a single drive/strafe/turn (ms)
    pub motion_timeout_ms: Option<u64>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            wheel_radius_cm: 3.75,
            gear_ratio: 20.0,
            encoder_ticks_per_rev: 28.0,
            turn_threshold_deg: 4.0,
            turn_termination: TurnTermination::default(),
            mixing: MixingGains::default(),
            stall: StallConfig::default(),
            poll_interval_ms: 10,
            motion_timeout_ms: None,
        }
    }
}

impl DriveConfig {
    /// Load a config from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading drivetrain config from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: DriveConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the kinematics cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("wheel_radius_cm", self.wheel_radius_cm)?;
        positive("gear_ratio", self.gear_ratio)?;
        positive("encoder_ticks_per_rev", self.encoder_ticks_per_rev)?;
        positive("turn_threshold_deg", self.turn_threshold_deg)?;
        positive("stall.low_speed_threshold", self.stall.low_speed_threshold)?;
        if self.stall.window_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "stall.window_ms",
                reason: "must be non-zero".into(),
            });
        }
        if self.motion_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "motion_timeout_ms",
                reason: "use null to disable the timeout".into(),
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn motion_timeout(&self) -> Option<Duration> {
        self.motion_timeout_ms.map(Duration::from_millis)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("expected a positive number, got {}", value),
        })
    }
}
