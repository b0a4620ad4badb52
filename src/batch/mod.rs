//! Cache comparison batches
//!
//! A run issues the same list of searches three times: twice with the
//! server cache allowed and once with it bypassed. Each batch yields a
//! [`crate::timing::BatchTiming`]; comparing the averages is left to the
//! caller.

pub mod filters;
pub mod runner;

pub use filters::{FilterList, FilterListError};
pub use runner::{BatchError, BatchRunner, CacheComparison, Phase, SearchTemplate};
