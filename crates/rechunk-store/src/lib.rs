//! Storage seam for chunked blobs.
//!
//! A blob lives in two independent record sets: one metadata document per
//! object, and one chunk record per `(object, index)`. Neither set offers a
//! transaction spanning the other, so this crate only exposes point writes,
//! selector-based removes and an update-modifier primitive over metadata.
//!
//! # Record Sets
//!
//! - metadata: a JSON [`Document`] keyed by object, mutated through a
//!   [`Patch`] (`$set`, `$unset`, `$inc`)
//! - chunks: raw bytes keyed by `(object, index)`, removed through a
//!   [`ChunkSelector`]
//!
//! # Storage Backends
//!
//! Backends implement [`ChunkStore`] (the write path) and [`BlobSource`]
//! (the read path):
//!
//! - [`InMemoryBlobStore`] -- `RwLock`-guarded maps for tests and embedding
//!
//! # Design Rules
//!
//! 1. Chunk upserts are idempotent: writing the same bytes twice is a no-op.
//! 2. `apply_metadata_patch` never creates a record; it reports how many it touched.
//! 3. The store never interprets chunk contents.
//! 4. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod patch;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBlobStore;
pub use patch::{Document, Patch, INC, SET, UNSET};
pub use traits::{BlobSource, ChunkSelector, ChunkStore};
