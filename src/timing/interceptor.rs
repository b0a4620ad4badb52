use async_trait::async_trait;
use metrics::{counter, histogram};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{BatchTiming, LatencyAccumulator, LatencyRecorder, TimingError};
use crate::fhir::{ClientError, InboundResponse, OutboundRequest, RequestInterceptor};

#[derive(Debug, Default)]
struct TimingState {
    recorder: LatencyRecorder,
    batch: LatencyAccumulator,
}

/// Request hook that times every search and sums the results per batch
///
/// `on_request_sent` starts the recorder with the request's label,
/// `on_response_received` stops it, adds the elapsed time to the batch total
/// and resets the recorder so each request is measured on its own.
#[derive(Debug, Default)]
pub struct TimingInterceptor {
    state: Mutex<TimingState>,
}

impl TimingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero the batch total before a new batch starts
    ///
    /// An operation still in flight from an aborted batch is discarded.
    pub async fn begin_batch(&self) {
        let mut state = self.state.lock().await;
        if let Some(label) = state.recorder.cancel() {
            warn!(label = %label, "Discarded stale timing at batch start");
        }
        state.batch.reset();
    }

    /// Close the current batch; `request_count` is the number of searches issued
    pub async fn finish_batch(&self, request_count: usize) -> Result<BatchTiming, TimingError> {
        self.state.lock().await.batch.finish(request_count)
    }

    /// Running total of the current batch
    pub async fn batch_total_millis(&self) -> u64 {
        self.state.lock().await.batch.total_millis()
    }
}

#[async_trait]
impl RequestInterceptor for TimingInterceptor {
    async fn on_request_sent(&self, request: &OutboundRequest) -> anyhow::Result<()> {
        self.state.lock().await.recorder.start(request.label())?;
        Ok(())
    }

    async fn on_response_received(&self, response: &InboundResponse) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        let elapsed_ms = state.recorder.stop()?;
        state.batch.record(elapsed_ms);
        state.recorder.reset();
        drop(state);

        debug!(sequence = response.sequence, elapsed_ms, "Request timed");
        histogram!("fhir_request_duration_ms", "cache" => response.cache.as_str())
            .record(elapsed_ms as f64);
        counter!("fhir_requests_total", "cache" => response.cache.as_str()).increment(1);
        Ok(())
    }

    async fn on_request_failed(&self, request: &OutboundRequest, error: &ClientError) {
        if let Some(label) = self.state.lock().await.recorder.cancel() {
            warn!(label = %label, error = %error, sequence = request.sequence, "Discarded timing for failed request");
        }
    }
}
