use async_trait::async_trait;
use tracing::debug;

use super::client::{ClientError, InboundResponse, OutboundRequest};

/// Hook into the outbound call lifecycle of a [`super::FhirClient`]
///
/// `on_request_sent` runs immediately before the transport is invoked and
/// `on_response_received` immediately after a response arrives. Returning an
/// error from either aborts the search.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn on_request_sent(&self, request: &OutboundRequest) -> anyhow::Result<()>;

    async fn on_response_received(&self, response: &InboundResponse) -> anyhow::Result<()>;

    /// Called instead of `on_response_received` when the request failed
    async fn on_request_failed(&self, _request: &OutboundRequest, _error: &ClientError) {}
}

/// Logs a one-line summary of every request and response
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInterceptor;

#[async_trait]
impl RequestInterceptor for LoggingInterceptor {
    async fn on_request_sent(&self, request: &OutboundRequest) -> anyhow::Result<()> {
        debug!(
            sequence = request.sequence,
            method = request.method,
            url = %request.url,
            cache = %request.cache,
            "Sending FHIR request"
        );
        Ok(())
    }

    async fn on_response_received(&self, response: &InboundResponse) -> anyhow::Result<()> {
        debug!(
            sequence = response.sequence,
            status = response.status,
            bytes = response.body_bytes,
            "Received FHIR response"
        );
        Ok(())
    }
}
