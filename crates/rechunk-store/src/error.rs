/// Errors from chunk and metadata store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The patch document is not a map of `$`-directives to field maps.
    #[error("invalid patch document: {0}")]
    InvalidPatch(String),

    /// The backend does not understand a directive.
    #[error("unsupported patch directive: {0}")]
    UnsupportedDirective(String),

    /// Two directives in one patch touch the same field.
    #[error("field '{field}' is targeted by both {first} and {second}")]
    ConflictingField {
        field: String,
        first: String,
        second: String,
    },

    /// A directive cannot be applied to the current field value.
    #[error("cannot apply {directive} to field '{field}': {reason}")]
    FieldTypeMismatch {
        directive: String,
        field: String,
        reason: String,
    },

    /// A record with this key already exists.
    #[error("object {0} already exists")]
    AlreadyExists(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Failure inside the storage backend (I/O, lock poisoning, transport).
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
