use async_trait::async_trait;
use reqwest::Url;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::client::{CachePolicy, ClientError, FhirTransport, OutboundRequest, TransportResponse};
use super::model::Bundle;

/// In-memory FHIR server with a simulated response cache
///
/// The first cache-eligible search for a URL, and every `no-cache` search,
/// takes `cold_latency`; repeated cache-eligible searches take
/// `warm_latency`. Latency is simulated with `tokio::time::sleep`, so tests
/// running on a paused clock observe exact durations.
pub struct MockTransport {
    cold_latency: Duration,
    warm_latency: Duration,
    bundles: HashMap<String, Bundle>,
    fail_on: HashSet<String>,
    warmed: Mutex<HashSet<String>>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            cold_latency: Duration::ZERO,
            warm_latency: Duration::ZERO,
            bundles: HashMap::new(),
            fail_on: HashSet::new(),
            warmed: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, cold: Duration, warm: Duration) -> Self {
        self.cold_latency = cold;
        self.warm_latency = warm;
        self
    }

    /// Respond to searches for `value` with `bundle`; other values get an empty bundle
    pub fn with_bundle(mut self, value: impl Into<String>, bundle: Bundle) -> Self {
        self.bundles.insert(value.into(), bundle);
        self
    }

    /// Fail every search for `value`
    pub fn failing_on(mut self, value: impl Into<String>) -> Self {
        self.fail_on.insert(value.into());
        self
    }

    /// Requests executed so far, in order
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn searched_value(url: &str) -> Result<String, ClientError> {
        let parsed = Url::parse(url).map_err(|e| ClientError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(parsed
            .query_pairs()
            .next()
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default())
    }

    fn latency_for(&self, request: &OutboundRequest) -> Duration {
        let Ok(mut warmed) = self.warmed.lock() else {
            return self.cold_latency;
        };
        let was_warm = !warmed.insert(request.url.clone());
        match request.cache {
            CachePolicy::Default if was_warm => self.warm_latency,
            _ => self.cold_latency,
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FhirTransport for MockTransport {
    async fn execute(&self, request: &OutboundRequest) -> Result<TransportResponse, ClientError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let value = Self::searched_value(&request.url)?;
        if self.fail_on.contains(&value) {
            return Err(ClientError::Simulated(format!("search for '{value}' failed")));
        }

        let latency = self.latency_for(request);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let body = match self.bundles.get(&value) {
            Some(bundle) => serde_json::to_string(bundle)?,
            None => serde_json::to_string(&Bundle::with_entries(Vec::new()))?,
        };
        Ok(TransportResponse { status: 200, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(sequence: u64, value: &str, cache: CachePolicy) -> OutboundRequest {
        OutboundRequest {
            sequence,
            method: "GET",
            url: format!("http://fhir.test/Patient?family={value}"),
            cache,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_search_is_served_warm() {
        let transport = MockTransport::new()
            .with_latency(Duration::from_millis(200), Duration::from_millis(20));

        let started = tokio::time::Instant::now();
        transport.execute(&request(1, "SMITH", CachePolicy::Default)).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(200));

        let started = tokio::time::Instant::now();
        transport.execute(&request(2, "SMITH", CachePolicy::Default)).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(20));

        let started = tokio::time::Instant::now();
        transport.execute(&request(3, "SMITH", CachePolicy::NoCache)).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_records_requests_and_serves_bundles() {
        let transport = MockTransport::new().with_bundle("SMITH", Bundle::with_entries(Vec::new()));
        transport.execute(&request(1, "SMITH", CachePolicy::Default)).await.unwrap();
        transport.execute(&request(2, "JONES", CachePolicy::NoCache)).await.unwrap();

        let seen = transport.requests();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].cache, CachePolicy::NoCache);
    }
}
