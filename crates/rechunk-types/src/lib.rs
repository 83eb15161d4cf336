//! Foundation types for rechunk.
//!
//! A chunked blob is stored as one metadata record plus a run of chunk
//! records keyed by `(object key, chunk index)`. This crate provides the
//! vocabulary every other rechunk crate shares.
//!
//! # Key Types
//!
//! - [`ObjectKey`]: bound for caller-supplied object identifiers
//! - [`ChunkSize`]: validated, non-zero bytes-per-chunk
//! - [`ChunkLayout`]: how a payload of a given length splits into chunks
//! - [`fields`]: names of the derived metadata fields
//! - [`TypeError`]: validation failures

pub mod chunk;
pub mod error;
pub mod fields;
pub mod key;

pub use chunk::{ChunkLayout, ChunkSize, DEFAULT_CHUNK_SIZE};
pub use error::TypeError;
pub use key::ObjectKey;
