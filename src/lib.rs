pub mod batch;
pub mod config;
pub mod demographics;
pub mod error;
pub mod fhir;
pub mod logging;
pub mod timing;

pub use config::*;
pub use error::*;

use std::sync::Arc;
use std::time::Duration;

use crate::batch::{BatchError, BatchRunner, CacheComparison, FilterList, SearchTemplate};
use crate::demographics::{SortedView, aggregate, sorted_view};
use crate::fhir::{FhirClient, FhirTransport, HttpTransport, LoggingInterceptor, SearchRequest};

/// What a probe run should do besides the cache batches
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Search the sample value once and report its demographics
    pub demographic_report: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            demographic_report: true,
        }
    }
}

/// Outcome of a probe run
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub people: Option<SortedView>,
    pub comparison: CacheComparison,
}

/// Run the probe against the configured FHIR server over HTTP
pub async fn run(config: &AppConfig, options: RunOptions) -> Result<ProbeReport, AppError> {
    let transport = HttpTransport::new(Duration::from_secs(config.server.request_timeout_secs))?;
    run_with_transport(config, Arc::new(transport), options).await
}

/// Run the probe over any transport
///
/// The filter list is loaded and checked first, so a missing or empty list
/// fails the run before any request is sent.
pub async fn run_with_transport(
    config: &AppConfig,
    transport: Arc<dyn FhirTransport>,
    options: RunOptions,
) -> Result<ProbeReport, AppError> {
    let filters = FilterList::load(&config.batch.filter_list_path).await?;
    if filters.is_empty() {
        return Err(BatchError::EmptyFilterList.into());
    }
    filters.check_expected_count(config.batch.expected_filter_count);

    let client = FhirClient::new(&config.server.base_url, transport)?
        .with_interceptor(Arc::new(LoggingInterceptor));

    let people = if options.demographic_report {
        Some(demographic_report(&client, &config.server).await?)
    } else {
        None
    };

    let template = SearchTemplate::new(&config.server.resource_type, &config.server.search_parameter);
    let runner = BatchRunner::new(client, template);
    let comparison = runner.run(&filters).await?;

    Ok(ProbeReport { people, comparison })
}

/// Search the configured sample value and order the matches by first name
pub async fn demographic_report(
    client: &FhirClient,
    server: &ServerConfig,
) -> Result<SortedView, AppError> {
    let request = SearchRequest::new(&server.resource_type, &server.search_parameter, &server.sample_value);
    let bundle = client.search(&request).await?;

    let people = aggregate(&bundle.entry)?;
    tracing::info!(
        value = %server.sample_value,
        entries = bundle.entry.len(),
        records = people.len(),
        "Aggregated demographic report"
    );
    Ok(sorted_view(people))
}
