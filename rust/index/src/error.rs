//! Error kinds surfaced by the searcher. Load-time model errors live in [`crate::model`];
//! these are the failures a running search can produce.

use lopq_error::{ErrorCodes, LopqError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cell fetch failed: {0}")]
    CellFetch(#[source] Box<dyn LopqError>),

    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl LopqError for SearchError {
    fn code(&self) -> ErrorCodes {
        match self {
            SearchError::InvalidArgument(_) => ErrorCodes::InvalidArgument,
            SearchError::CellFetch(source) => source.code(),
            SearchError::DataCorruption(_) => ErrorCodes::DataLoss,
        }
    }
}
