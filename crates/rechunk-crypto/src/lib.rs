//! Content checksums for rechunk.
//!
//! A blob's metadata record carries one digest over its full byte string.
//! The digest wraps established libraries (`md-5`, `blake3`); nothing here
//! is custom cryptography.

pub mod checksum;

pub use checksum::{Checksum, ChecksumAlgorithm, ChecksumError};
