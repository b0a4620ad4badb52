use std::fmt;

use super::ExtractionError;
use crate::fhir::BundleEntry;

/// Stable identity of a record, used as the aggregation key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// First name, last name and birth date of one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demographics {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<String>,
}

impl Demographics {
    /// Derive the demographics of `entry`
    ///
    /// Uses the first given name and the first family name found; a record
    /// without either is malformed and rejected rather than guessed at.
    pub fn from_entry(entry: &BundleEntry) -> Result<Self, ExtractionError> {
        let record = record_id(entry)?;

        let first_name = extract_first_names(entry)
            .into_iter()
            .next()
            .ok_or_else(|| ExtractionError::MissingGivenName {
                record: record.to_string(),
            })?;
        let last_name = extract_last_names(entry)
            .into_iter()
            .next()
            .ok_or_else(|| ExtractionError::MissingFamilyName {
                record: record.to_string(),
            })?;

        Ok(Self {
            first_name,
            last_name,
            birth_date: extract_birth_date(entry),
        })
    }
}

/// Resource id, falling back to the entry's full URL
pub fn record_id(entry: &BundleEntry) -> Result<RecordId, ExtractionError> {
    let present = |value: &Option<String>| value.as_deref().filter(|v| !v.is_empty()).map(str::to_string);
    present(&entry.resource.id)
        .or_else(|| present(&entry.full_url))
        .map(RecordId)
        .ok_or_else(|| ExtractionError::MissingIdentity {
            resource_type: entry.resource.resource_type.clone(),
        })
}

/// Every given name across every name entry, in source order
pub fn extract_first_names(entry: &BundleEntry) -> Vec<String> {
    entry
        .resource
        .name
        .iter()
        .flat_map(|name| name.given.iter().cloned())
        .collect()
}

/// Every family name across every name entry, in source order
pub fn extract_last_names(entry: &BundleEntry) -> Vec<String> {
    entry
        .resource
        .name
        .iter()
        .filter_map(|name| name.family.clone())
        .collect()
}

/// Birth date, or `None` when the record has none
pub fn extract_birth_date(entry: &BundleEntry) -> Option<String> {
    entry
        .resource
        .birth_date
        .clone()
        .filter(|date| !date.trim().is_empty())
}
