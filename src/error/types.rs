use thiserror::Error;

use crate::batch::{BatchError, FilterListError};
use crate::demographics::ExtractionError;
use crate::fhir::ClientError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    FilterList(#[from] FilterListError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Process exit code, following the sysexits convention
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 78,
            AppError::FilterList(_) => 66,
            AppError::Client(_) => 69,
            AppError::Extraction(_) => 65,
            AppError::Batch(BatchError::EmptyFilterList) => 65,
            AppError::Batch(BatchError::Request { .. }) => 69,
            AppError::Batch(BatchError::Timing { .. }) | AppError::Internal(_) => 70,
        }
    }
}
