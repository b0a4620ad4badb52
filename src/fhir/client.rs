use async_trait::async_trait;
use reqwest::Url;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

use super::interceptor::RequestInterceptor;
use super::model::Bundle;

/// Server-side caching behaviour requested for a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachePolicy {
    /// Let the server answer from its cache when it can
    Default,
    /// Ask the server to skip its cache and recompute
    NoCache,
}

impl CachePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CachePolicy::Default => "default",
            CachePolicy::NoCache => "no-cache",
        }
    }

    /// Value of the `Cache-Control` request header, if one is sent
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            CachePolicy::Default => None,
            CachePolicy::NoCache => Some("no-cache"),
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "Search `resource_type` where `parameter` matches `value`"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub resource_type: String,
    pub parameter: String,
    pub value: String,
    pub cache: CachePolicy,
}

impl SearchRequest {
    pub fn new(
        resource_type: impl Into<String>,
        parameter: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            parameter: parameter.into(),
            value: value.into(),
            cache: CachePolicy::Default,
        }
    }

    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }
}

/// A search as it leaves the client, after URL construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// Per-client sequence number, unique for the client's lifetime
    pub sequence: u64,
    pub method: &'static str,
    pub url: String,
    pub cache: CachePolicy,
}

impl OutboundRequest {
    /// Identity of this request, used to label timed operations
    pub fn label(&self) -> String {
        format!("{} {} #{}", self.method, self.url, self.sequence)
    }
}

/// Summary of a successful response, handed to interceptors
///
/// Interceptors see the response as soon as it arrives, before the body is
/// decoded into a [`Bundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundResponse {
    pub sequence: u64,
    pub status: u16,
    pub body_bytes: usize,
    pub cache: CachePolicy,
}

/// What a transport hands back for a successful search: the raw JSON body
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// FHIR client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Failed to decode search response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Interceptor rejected request: {0}")]
    Interceptor(#[source] anyhow::Error),

    #[error("Simulated failure: {0}")]
    Simulated(String),
}

/// Executes an outbound search against some FHIR server
#[async_trait]
pub trait FhirTransport: Send + Sync {
    async fn execute(&self, request: &OutboundRequest) -> Result<TransportResponse, ClientError>;
}

/// FHIR search client with an ordered chain of request interceptors
///
/// Every search notifies each interceptor before the transport is called and
/// again once a response (or failure) comes back, so hooks fire for every
/// request regardless of its cache policy.
pub struct FhirClient {
    base_url: Url,
    transport: Arc<dyn FhirTransport>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    sequence: AtomicU64,
}

impl FhirClient {
    pub fn new(base_url: &str, transport: Arc<dyn FhirTransport>) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            ClientError::InvalidUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            base_url,
            transport,
            interceptors: Vec::new(),
            sequence: AtomicU64::new(0),
        })
    }

    pub fn register_interceptor(&mut self, interceptor: Arc<dyn RequestInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.register_interceptor(interceptor);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/{resource_type}?{parameter}={value}`
    pub fn search_url(&self, request: &SearchRequest) -> Result<Url, ClientError> {
        let raw = format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), request.resource_type);
        Url::parse_with_params(&raw, &[(request.parameter.as_str(), request.value.as_str())])
            .map_err(|e| ClientError::InvalidUrl {
                url: raw,
                reason: e.to_string(),
            })
    }

    /// Run one search through the interceptor chain and the transport
    pub async fn search(&self, request: &SearchRequest) -> Result<Bundle, ClientError> {
        let outbound = OutboundRequest {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed) + 1,
            method: "GET",
            url: self.search_url(request)?.to_string(),
            cache: request.cache,
        };

        for (notified, interceptor) in self.interceptors.iter().enumerate() {
            if let Err(err) = interceptor.on_request_sent(&outbound).await {
                let err = ClientError::Interceptor(err);
                self.notify_failed(&self.interceptors[..notified], &outbound, &err).await;
                return Err(err);
            }
        }

        let response = match self.transport.execute(&outbound).await {
            Ok(response) => response,
            Err(err) => {
                self.notify_failed(&self.interceptors, &outbound, &err).await;
                return Err(err);
            }
        };

        let inbound = InboundResponse {
            sequence: outbound.sequence,
            status: response.status,
            body_bytes: response.body.len(),
            cache: outbound.cache,
        };
        for (index, interceptor) in self.interceptors.iter().enumerate() {
            if let Err(err) = interceptor.on_response_received(&inbound).await {
                let err = ClientError::Interceptor(err);
                self.notify_failed(&self.interceptors[index + 1..], &outbound, &err).await;
                return Err(err);
            }
        }

        let bundle: Bundle = serde_json::from_str(&response.body)?;
        debug!(
            sequence = outbound.sequence,
            bytes = response.body.len(),
            entries = bundle.entry.len(),
            "Decoded search bundle"
        );
        Ok(bundle)
    }

    async fn notify_failed(
        &self,
        interceptors: &[Arc<dyn RequestInterceptor>],
        request: &OutboundRequest,
        error: &ClientError,
    ) {
        warn!(sequence = request.sequence, url = %request.url, error = %error, "FHIR search failed");
        for interceptor in interceptors {
            interceptor.on_request_failed(request, error).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhir::mock::MockTransport;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EventLog {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RequestInterceptor for EventLog {
        async fn on_request_sent(&self, request: &OutboundRequest) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(format!("sent {}", request.sequence));
            Ok(())
        }

        async fn on_response_received(&self, response: &InboundResponse) -> anyhow::Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(format!("received {} ({})", response.sequence, response.cache));
            Ok(())
        }

        async fn on_request_failed(&self, request: &OutboundRequest, _error: &ClientError) {
            self.events.lock().unwrap().push(format!("failed {}", request.sequence));
        }
    }

    fn client_with(transport: MockTransport, log: Arc<EventLog>) -> FhirClient {
        FhirClient::new("http://hapi.fhir.org/baseR4/", Arc::new(transport))
            .unwrap()
            .with_interceptor(log)
    }

    #[test]
    fn test_search_url_encodes_value() {
        let client = FhirClient::new("http://hapi.fhir.org/baseR4", Arc::new(MockTransport::new())).unwrap();
        let url = client
            .search_url(&SearchRequest::new("Patient", "family", "O'BRIEN SMITH"))
            .unwrap();

        assert_eq!(url.path(), "/baseR4/Patient");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("family".to_string(), "O'BRIEN SMITH".to_string())]);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = FhirClient::new("not a url", Arc::new(MockTransport::new()));
        assert!(matches!(result, Err(ClientError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_interceptors_fire_for_every_cache_policy() {
        let log = Arc::new(EventLog::default());
        let client = client_with(MockTransport::new(), log.clone());

        client.search(&SearchRequest::new("Patient", "family", "SMITH")).await.unwrap();
        client
            .search(&SearchRequest::new("Patient", "family", "SMITH").with_cache(CachePolicy::NoCache))
            .await
            .unwrap();

        let events = log.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["sent 1", "received 1 (default)", "sent 2", "received 2 (no-cache)"]
        );
    }

    #[tokio::test]
    async fn test_transport_failure_notifies_interceptors() {
        let log = Arc::new(EventLog::default());
        let client = client_with(MockTransport::new().failing_on("JONES"), log.clone());

        let result = client.search(&SearchRequest::new("Patient", "family", "JONES")).await;
        assert!(matches!(result, Err(ClientError::Simulated(_))));

        let events = log.events.lock().unwrap().clone();
        assert_eq!(events, vec!["sent 1", "failed 1"]);
    }

    struct RejectFirstResponse {
        rejected: AtomicU64,
    }

    #[async_trait]
    impl RequestInterceptor for RejectFirstResponse {
        async fn on_request_sent(&self, _request: &OutboundRequest) -> anyhow::Result<()> {
            Ok(())
        }

        async fn on_response_received(&self, _response: &InboundResponse) -> anyhow::Result<()> {
            if self.rejected.fetch_add(1, Ordering::Relaxed) == 0 {
                anyhow::bail!("transient hook failure");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_response_hook_failure_notifies_remaining_interceptors() {
        let log = Arc::new(EventLog::default());
        let client = FhirClient::new("http://hapi.fhir.org/baseR4", Arc::new(MockTransport::new()))
            .unwrap()
            .with_interceptor(Arc::new(RejectFirstResponse {
                rejected: AtomicU64::new(0),
            }))
            .with_interceptor(log.clone());

        let request = SearchRequest::new("Patient", "family", "SMITH");
        let result = client.search(&request).await;
        assert!(matches!(result, Err(ClientError::Interceptor(_))));
        client.search(&request).await.unwrap();

        let events = log.events.lock().unwrap().clone();
        assert_eq!(events, vec!["sent 1", "failed 1", "sent 2", "received 2 (default)"]);
    }

    struct MalformedBody;

    #[async_trait]
    impl FhirTransport for MalformedBody {
        async fn execute(&self, _request: &OutboundRequest) -> Result<TransportResponse, ClientError> {
            Ok(TransportResponse {
                status: 200,
                body: "{not json".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_response_hooks_fire_before_decoding() {
        let log = Arc::new(EventLog::default());
        let client = FhirClient::new("http://hapi.fhir.org/baseR4", Arc::new(MalformedBody))
            .unwrap()
            .with_interceptor(log.clone());

        let result = client.search(&SearchRequest::new("Patient", "family", "SMITH")).await;
        assert!(matches!(result, Err(ClientError::Decode(_))));

        let events = log.events.lock().unwrap().clone();
        assert_eq!(events, vec!["sent 1", "received 1 (default)"]);
    }

    #[test]
    fn test_request_label_includes_sequence() {
        let request = OutboundRequest {
            sequence: 7,
            method: "GET",
            url: "http://hapi.fhir.org/baseR4/Patient?family=SMITH".to_string(),
            cache: CachePolicy::Default,
        };
        assert_eq!(
            request.label(),
            "GET http://hapi.fhir.org/baseR4/Patient?family=SMITH #7"
        );
    }
}
