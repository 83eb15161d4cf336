//! Metadata field names the updater derives from a blob's bytes.

/// Total byte length of the blob.
pub const LENGTH: &str = "length";
/// Bytes per chunk, except possibly the last.
pub const CHUNK_SIZE: &str = "chunkSize";
/// Hex digest of the full byte string.
pub const CHECKSUM: &str = "checksum";

/// All derived fields, in the order they are written.
pub const DERIVED: [&str; 3] = [LENGTH, CHUNK_SIZE, CHECKSUM];
