// Telemetry observers for the motion controller
//
// Diagnostics are best-effort: sinks cannot fail, and the controller never
// waits on them.

use tracing::debug;

/// Line-oriented telemetry sink
pub trait Diagnostics {
    /// Queue one line for the next update
    fn add_data(&mut self, line: String);
    /// Flush queued lines
    fn update(&mut self);
}

/// Emits each flushed line as a `tracing` debug event
#[derive(Debug, Default)]
pub struct TracingDiagnostics {
    pending: Vec<String>,
}

impl Diagnostics for TracingDiagnostics {
    fn add_data(&mut self, line: String) {
        self.pending.push(line);
    }

    fn update(&mut self) {
        for line in self.pending.drain(..) {
            debug!(target: "mecanum::telemetry", "{}", line);
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn add_data(&mut self, _line: String) {}

    fn update(&mut self) {}
}
