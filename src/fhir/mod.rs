//! FHIR search client
//!
//! This module is the boundary to the remote clinical-resource server:
//! - `model`: the parts of the FHIR R4 JSON model the crate reads
//! - `client`: search requests, cache policies, and the interceptor-aware client
//! - `interceptor`: the request/response hook trait plus a logging hook
//! - `http`: the reqwest transport used against a real server
//! - `mock`: an in-memory transport with simulated cache latency

pub mod client;
pub mod http;
pub mod interceptor;
pub mod mock;
pub mod model;

pub use client::{
    CachePolicy, ClientError, FhirClient, FhirTransport, InboundResponse, OutboundRequest,
    SearchRequest, TransportResponse,
};
pub use http::HttpTransport;
pub use interceptor::{LoggingInterceptor, RequestInterceptor};
pub use mock::MockTransport;
pub use model::{Bundle, BundleEntry, HumanName, Resource};
