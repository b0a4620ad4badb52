//! Request latency instrumentation
//!
//! This module measures how long outbound FHIR searches take:
//! - [`LatencyRecorder`]: a stopwatch that times one operation at a time
//! - [`LatencyAccumulator`] / [`BatchTiming`]: the running total of a batch
//!   and the average derived from it
//! - [`TimingInterceptor`]: the hook that drives the recorder from the
//!   client's request/response lifecycle
//!
//! # Single operation in flight
//!
//! Requests are issued strictly one after another, so the recorder only ever
//! times a single operation. Starting a second operation before the first is
//! stopped is treated as a wiring bug and rejected with
//! [`TimingError::AlreadyRunning`]; the running total is left untouched.

use thiserror::Error;

pub mod accumulator;
pub mod interceptor;
pub mod recorder;

pub use accumulator::{BatchTiming, LatencyAccumulator};
pub use interceptor::TimingInterceptor;
pub use recorder::LatencyRecorder;

/// Errors raised by the timing layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimingError {
    #[error("Cannot start '{attempted}': '{running}' is still being timed")]
    AlreadyRunning { running: String, attempted: String },

    #[error("No operation is being timed")]
    NotRunning,

    #[error("Batch contains no requests; average is undefined")]
    EmptyBatch,

    #[error("Timed {observed} request(s) but the batch issued {expected}")]
    SampleCountMismatch { expected: usize, observed: usize },
}
