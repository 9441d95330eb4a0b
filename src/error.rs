// Error types for drivetrain control

use crate::drivetrain::HardwareError;

/// Result type alias
pub type Result<T> = std::result::Result<T, DriveError>;

/// Errors surfaced by motion commands
///
/// A stall is not an error: it ends the motion early and is reported as
/// [`MotionOutcome::Stalled`](crate::drivetrain::MotionOutcome::Stalled).
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Invalid motion request: {0}")]
    InvalidMotionRequest(String),

    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(#[from] HardwareError),
}

impl DriveError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        DriveError::InvalidMotionRequest(reason.into())
    }
}
