use rechunk_store::StoreError;
use rechunk_types::TypeError;

use crate::saga::SagaStep;

/// Errors from updating or reading a chunked blob.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// The payload is not a byte string.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The requested chunk size is zero, negative or not an integer.
    #[error(transparent)]
    InvalidChunkSize(#[from] TypeError),

    /// The options document is malformed.
    #[error("invalid update options: {0}")]
    InvalidOptions(String),

    /// The patch is not a valid update-modifier document.
    #[error("invalid patch: {0}")]
    InvalidPatch(#[source] StoreError),

    /// No metadata record exists for the object.
    #[error("object '{id}' did not exist to update")]
    NotFound { id: String },

    /// A store call failed during a saga step.
    #[error("store failure during {step}: {source}")]
    Store {
        step: SagaStep,
        #[source]
        source: StoreError,
    },

    /// Removing the object's chunks after a failed metadata patch failed too.
    /// The original failure is the source; the rollback failure is kept
    /// alongside it.
    #[error("{original} (chunk rollback for '{id}' also failed: {rollback})")]
    RollbackFailed {
        id: String,
        #[source]
        original: Box<UpdateError>,
        rollback: StoreError,
    },

    /// A store call failed while reading a blob back.
    #[error("store read failed: {0}")]
    Read(#[source] StoreError),

    /// The stored chunks or metadata of an object are inconsistent.
    #[error("object '{id}' is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    /// A per-object lock could not be acquired.
    #[error("lock for '{id}' unavailable: {reason}")]
    Lock { id: String, reason: String },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UpdateError {
    /// Returns `true` for errors raised before any store call was made.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::InvalidPayload(_)
                | Self::InvalidChunkSize(_)
                | Self::InvalidOptions(_)
                | Self::InvalidPatch(_)
        )
    }

    /// Returns `true` if the object's metadata record was missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::RollbackFailed { original, .. } => original.is_not_found(),
            _ => false,
        }
    }
}

/// Result alias for updater operations.
pub type UpdateResult<T> = Result<T, UpdateError>;
