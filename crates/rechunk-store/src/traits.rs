use rechunk_types::ObjectKey;

use crate::error::StoreResult;
use crate::patch::{Document, Patch};

/// Which chunk records of an object a remove applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkSelector {
    /// Every chunk of the object.
    All,
    /// Chunks whose index is `>= n`.
    From(u64),
}

impl ChunkSelector {
    /// Returns `true` if the chunk at `index` is selected.
    pub fn matches(&self, index: u64) -> bool {
        match self {
            Self::All => true,
            Self::From(n) => index >= *n,
        }
    }
}

/// Write path over the two record sets of a chunked blob.
///
/// Implementations must satisfy these invariants:
/// - `upsert_chunk` creates or replaces the record for `(id, index)` and is
///   idempotent.
/// - `remove_chunks` deletes only records of `id` matched by the selector.
/// - `apply_metadata_patch` never creates a metadata record. It returns the
///   number of records it modified: `0` when `id` has no metadata, `1`
///   otherwise.
/// - No operation spans both record sets; callers order their writes.
pub trait ChunkStore<K: ObjectKey>: Send + Sync {
    /// Create or replace chunk `index` of object `id`.
    fn upsert_chunk(&self, id: &K, index: u64, data: &[u8]) -> StoreResult<()>;

    /// Delete the chunks of `id` matched by `selector`. Returns how many
    /// records were removed.
    fn remove_chunks(&self, id: &K, selector: ChunkSelector) -> StoreResult<u64>;

    /// Apply an update-modifier document to the metadata record of `id`.
    fn apply_metadata_patch(&self, id: &K, patch: &Patch) -> StoreResult<u64>;
}

/// Read path over the two record sets of a chunked blob.
pub trait BlobSource<K: ObjectKey>: Send + Sync {
    /// The metadata record of `id`, or `None` if the object does not exist.
    fn metadata(&self, id: &K) -> StoreResult<Option<Document>>;

    /// Indices of every chunk stored for `id`, ascending.
    fn chunk_indices(&self, id: &K) -> StoreResult<Vec<u64>>;

    /// Bytes of chunk `index` of `id`, or `None` if absent.
    fn read_chunk(&self, id: &K, index: u64) -> StoreResult<Option<Vec<u8>>>;

    /// Every chunk of `id` in index order.
    ///
    /// Default implementation calls `read_chunk()` per index. Backends may
    /// override to scan once.
    fn read_chunks(&self, id: &K) -> StoreResult<Vec<(u64, Vec<u8>)>> {
        let mut chunks = Vec::new();
        for index in self.chunk_indices(id)? {
            if let Some(data) = self.read_chunk(id, index)? {
                chunks.push((index, data));
            }
        }
        Ok(chunks)
    }
}
