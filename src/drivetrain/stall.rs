// Velocity-based stall detection
// Stalled means: non-zero power, average wheel speed below the threshold, and
// a velocity that has not changed at all over a full sampling window.
// The detector is pure; callers pass the current time and a StallSample.

use std::time::Duration;

use tracing::debug;

use crate::config::StallConfig;

/// Aggregate drivetrain readings for one poll
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StallSample {
    /// Mean of the absolute wheel velocities (ticks/s)
    pub average_velocity: f64,
    /// Sum of the absolute commanded powers
    pub total_power: f64,
}

impl StallSample {
    /// Build a sample from (velocity, power) pairs, one per wheel
    pub fn from_readings(readings: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut count = 0usize;
        let mut velocity = 0.0;
        let mut power = 0.0;
        for (v, p) in readings {
            velocity += v.abs();
            power += p.abs();
            count += 1;
        }
        let average_velocity = if count == 0 { 0.0 } else { velocity / count as f64 };
        Self {
            average_velocity,
            total_power: power,
        }
    }
}

/// Windowed stall detector
#[derive(Debug, Clone)]
pub struct StallDetector {
    window: Duration,
    low_speed_threshold: f64,
    /// Start of the open window, `None` when idle
    window_start: Option<Duration>,
    /// Average velocity at the end of the previous window
    last_average_velocity: f64,
}

impl StallDetector {
    pub fn new(config: StallConfig) -> Self {
        Self {
            window: config.window(),
            low_speed_threshold: config.low_speed_threshold,
            window_start: None,
            last_average_velocity: 0.0,
        }
    }

    /// Forget the open window and the velocity baseline.
    ///
    /// Must be called before the first poll of a new motion, otherwise a
    /// baseline left over from the previous motion can trigger a false stall.
    pub fn reset(&mut self) {
        self.window_start = None;
        self.last_average_velocity = 0.0;
    }

    pub fn is_window_open(&self) -> bool {
        self.window_start.is_some()
    }

    pub fn last_average_velocity(&self) -> f64 {
        self.last_average_velocity
    }

    /// Feed one poll; returns true only on the poll that closes a stalled window
    pub fn poll(&mut self, now: Duration, sample: StallSample) -> bool {
        let start = *self.window_start.get_or_insert(now);
        if now.saturating_sub(start) < self.window {
            return false;
        }

        let velocity = sample.average_velocity;
        let unchanged = (velocity - self.last_average_velocity).abs() == 0.0;
        let stalled =
            unchanged && velocity.abs() < self.low_speed_threshold && sample.total_power != 0.0;

        debug!(
            velocity,
            last_velocity = self.last_average_velocity,
            total_power = sample.total_power,
            stalled,
            "Stall window closed"
        );

        self.last_average_velocity = velocity;
        self.window_start = None;
        stalled
    }
}
