//! Demographic extraction and ordering
//!
//! Turns search result entries into (first name, last name, birth date)
//! triples keyed by record identity, then orders them by first name for
//! reporting.

use thiserror::Error;

pub mod aggregate;
pub mod extract;

pub use aggregate::{
    AggregateMap, BIRTH_DATE_NOT_FOUND, PersonReport, SortedView, aggregate, render_report,
    sort_by_first_name, sorted_view,
};
pub use extract::{
    Demographics, RecordId, extract_birth_date, extract_first_names, extract_last_names,
    record_id,
};

/// A record that cannot be reduced to demographics
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("Record {record} has no given name")]
    MissingGivenName { record: String },

    #[error("Record {record} has no family name")]
    MissingFamilyName { record: String },

    #[error("{resource_type} entry has neither an id nor a full URL")]
    MissingIdentity { resource_type: String },
}
