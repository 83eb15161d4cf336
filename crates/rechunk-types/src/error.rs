use thiserror::Error;

/// Errors produced by type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("chunk size must be an integer >= 1, got {0}")]
    InvalidChunkSize(String),
}
