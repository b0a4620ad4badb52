//! Subset of the FHIR R4 JSON model used by patient searches
//!
//! Only the fields this crate reads are modelled; everything else in the
//! server's response is ignored during deserialization.

use serde::{Deserialize, Serialize};

/// Search result set returned by the server
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    #[serde(default = "default_bundle_type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

fn default_bundle_type() -> String {
    "Bundle".to_string()
}

impl Bundle {
    pub fn with_entries(entry: Vec<BundleEntry>) -> Self {
        Self {
            resource_type: default_bundle_type(),
            total: Some(entry.len() as u64),
            entry,
        }
    }
}

/// One entry of a search result, wrapping a single resource
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    pub resource: Resource,
}

/// A resource as returned by a search
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Vec<HumanName>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
}

/// FHIR `HumanName`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HumanName {
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default)]
    pub given: Vec<String>,
}
