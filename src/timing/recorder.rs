use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use super::TimingError;

/// Operation currently being timed
#[derive(Debug, Clone)]
struct InFlight {
    label: String,
    started: Instant,
}

/// Stopwatch-style latency recorder
///
/// `start` opens an operation, `stop` closes it and returns the elapsed
/// milliseconds, adding them to the accumulated total until `reset` is
/// called. Uses the tokio clock so paused-time tests observe exact values.
#[derive(Debug, Default)]
pub struct LatencyRecorder {
    in_flight: Option<InFlight>,
    accumulated: Duration,
}

impl LatencyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin timing the operation identified by `label`
    ///
    /// Fails with [`TimingError::AlreadyRunning`] if another operation has
    /// not been stopped yet. The existing operation keeps running.
    pub fn start(&mut self, label: impl Into<String>) -> Result<(), TimingError> {
        let label = label.into();
        if let Some(running) = &self.in_flight {
            return Err(TimingError::AlreadyRunning {
                running: running.label.clone(),
                attempted: label,
            });
        }

        trace!(label = %label, "Timing started");
        self.in_flight = Some(InFlight {
            label,
            started: Instant::now(),
        });
        Ok(())
    }

    /// End the running operation and return its elapsed milliseconds
    pub fn stop(&mut self) -> Result<u64, TimingError> {
        let in_flight = self.in_flight.take().ok_or(TimingError::NotRunning)?;
        let elapsed = in_flight.started.elapsed();
        self.accumulated += elapsed;

        trace!(
            label = %in_flight.label,
            elapsed_ms = elapsed.as_millis() as u64,
            "Timing stopped"
        );
        Ok(elapsed.as_millis() as u64)
    }

    /// Drop the running operation without recording it
    ///
    /// Returns the label of the discarded operation, if any.
    pub fn cancel(&mut self) -> Option<String> {
        self.in_flight.take().map(|in_flight| in_flight.label)
    }

    /// Zero the accumulated total
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn current_label(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|in_flight| in_flight.label.as_str())
    }

    /// Milliseconds accumulated since the last reset
    pub fn total_millis(&self) -> u64 {
        self.accumulated.as_millis() as u64
    }
}
