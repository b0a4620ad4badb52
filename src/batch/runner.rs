use metrics::histogram;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use super::filters::FilterList;
use crate::fhir::{CachePolicy, ClientError, FhirClient, SearchRequest};
use crate::timing::{BatchTiming, TimingError, TimingInterceptor};

/// The three batches of a run, executed in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Cold pass, server cache allowed
    CachedPass1,
    /// Repeat of the first pass, expected to hit the server cache
    CachedPass2,
    /// Same queries with the cache bypassed
    UncachedPass,
}

impl Phase {
    pub fn cache_policy(&self) -> CachePolicy {
        match self {
            Phase::CachedPass1 | Phase::CachedPass2 => CachePolicy::Default,
            Phase::UncachedPass => CachePolicy::NoCache,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::CachedPass1 => "cached_pass_1",
            Phase::CachedPass2 => "cached_pass_2",
            Phase::UncachedPass => "uncached_pass",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch runner errors
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Filter list is empty; batch averages would divide by zero")]
    EmptyFilterList,

    #[error("Search for '{filter}' failed during {phase}: {source}")]
    Request {
        phase: Phase,
        filter: String,
        #[source]
        source: ClientError,
    },

    #[error("Timing failed during {phase}: {source}")]
    Timing {
        phase: Phase,
        #[source]
        source: TimingError,
    },
}

/// Which resource and search parameter each batch query uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTemplate {
    pub resource_type: String,
    pub parameter: String,
}

impl SearchTemplate {
    pub fn new(resource_type: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            parameter: parameter.into(),
        }
    }

    pub fn request(&self, value: &str, cache: CachePolicy) -> SearchRequest {
        SearchRequest::new(&self.resource_type, &self.parameter, value).with_cache(cache)
    }
}

impl Default for SearchTemplate {
    fn default() -> Self {
        Self::new("Patient", "family")
    }
}

/// Timings of the three batches of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheComparison {
    pub cached_first: BatchTiming,
    pub cached_second: BatchTiming,
    pub uncached: BatchTiming,
}

impl CacheComparison {
    /// Per-request averages in phase order
    pub fn averages(&self) -> [u64; 3] {
        [
            self.cached_first.average_millis(),
            self.cached_second.average_millis(),
            self.uncached.average_millis(),
        ]
    }

    /// Whether the repeated cached pass beat the mean of the cold and uncached passes
    pub fn cached_repeat_is_faster(&self) -> bool {
        let [first, second, third] = self.averages();
        second < (first + third) / 2
    }
}

impl fmt::Display for CacheComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [first, second, third] = self.averages();
        write!(
            f,
            "The average response time for 3 times are {first}ms {second}ms {third}ms"
        )
    }
}

/// Runs the same filter list three times and times each batch
///
/// The runner installs its own [`TimingInterceptor`] on the client at
/// construction; the client's other interceptors keep firing as before.
/// Requests are issued one at a time and the first failure aborts the run.
pub struct BatchRunner {
    client: FhirClient,
    timing: Arc<TimingInterceptor>,
    template: SearchTemplate,
}

impl BatchRunner {
    pub fn new(mut client: FhirClient, template: SearchTemplate) -> Self {
        let timing = Arc::new(TimingInterceptor::new());
        client.register_interceptor(timing.clone());
        Self {
            client,
            timing,
            template,
        }
    }

    pub fn client(&self) -> &FhirClient {
        &self.client
    }

    /// Run the cold, repeated and uncached batches in sequence
    pub async fn run(&self, filters: &FilterList) -> Result<CacheComparison, BatchError> {
        if filters.is_empty() {
            return Err(BatchError::EmptyFilterList);
        }

        let span = info_span!("batch_run", run_id = %Uuid::new_v4(), filters = filters.len());
        async {
            let cached_first = self.run_phase(Phase::CachedPass1, filters).await?;
            let cached_second = self.run_phase(Phase::CachedPass2, filters).await?;
            let uncached = self.run_phase(Phase::UncachedPass, filters).await?;

            let comparison = CacheComparison {
                cached_first,
                cached_second,
                uncached,
            };
            info!(
                averages_ms = ?comparison.averages(),
                cached_repeat_faster = comparison.cached_repeat_is_faster(),
                "Batch run complete"
            );
            Ok::<_, BatchError>(comparison)
        }
        .instrument(span)
        .await
    }

    /// Issue one search per filter value under `phase`'s cache policy
    pub async fn run_phase(&self, phase: Phase, filters: &FilterList) -> Result<BatchTiming, BatchError> {
        if filters.is_empty() {
            return Err(BatchError::EmptyFilterList);
        }

        let span = info_span!("batch_phase", phase = %phase, cache = %phase.cache_policy());
        async {
            self.timing.begin_batch().await;

            for value in filters.iter() {
                let request = self.template.request(value, phase.cache_policy());
                self.client
                    .search(&request)
                    .await
                    .map_err(|source| BatchError::Request {
                        phase,
                        filter: value.to_string(),
                        source,
                    })?;
            }

            let timing = self
                .timing
                .finish_batch(filters.len())
                .await
                .map_err(|source| BatchError::Timing { phase, source })?;

            info!(
                total_ms = timing.total_elapsed_millis(),
                requests = timing.request_count(),
                average_ms = timing.average_millis(),
                "The average response time is {}ms",
                timing.average_millis()
            );
            histogram!("fhir_batch_average_ms", "phase" => phase.as_str())
                .record(timing.average_millis() as f64);
            Ok::<_, BatchError>(timing)
        }
        .instrument(span)
        .await
    }
}
