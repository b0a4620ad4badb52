use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use std::time::Duration;
use tracing::debug;

use super::client::{ClientError, FhirTransport, OutboundRequest, TransportResponse};

/// Media type requested from the server
pub const FHIR_JSON: &str = "application/fhir+json";

/// FHIR transport over HTTP(S) using reqwest
///
/// The cache policy of a request maps onto the `Cache-Control` header. The
/// only timeout applied is the client-wide `request_timeout`; there is no
/// retry. The body is returned undecoded.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FhirTransport for HttpTransport {
    async fn execute(&self, request: &OutboundRequest) -> Result<TransportResponse, ClientError> {
        let mut builder = self.client.get(&request.url).header(ACCEPT, FHIR_JSON);
        if let Some(directive) = request.cache.header_value() {
            builder = builder.header(CACHE_CONTROL, directive);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        let body = response.text().await?;
        debug!(sequence = request.sequence, bytes = body.len(), "Received search response");

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}
