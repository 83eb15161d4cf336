//! In-place content updates for chunked blobs.
//!
//! A chunked blob is one metadata record plus chunk records `0..n`, kept in
//! two record sets with no shared transaction. [`ChunkedBlobUpdater`]
//! replaces a blob's bytes by running an ordered saga against a
//! [`ChunkStore`](rechunk_store::ChunkStore):
//!
//! 1. [`SagaStep::WriteChunks`] -- upsert the new chunks, low index first
//! 2. [`SagaStep::PruneTail`] -- remove chunks past the new end
//! 3. [`SagaStep::ApplyPatch`] -- patch metadata with `length`, `chunkSize`
//!    and `checksum` forced into `$set`
//!
//! If the last step touches no record or fails, all chunks of the object
//! are removed, so a failed update never leaves chunks without metadata.
//!
//! ```
//! use rechunk_crypto::ChecksumAlgorithm;
//! use rechunk_store::{BlobSource, Document, InMemoryBlobStore, Patch};
//! use rechunk_types::ChunkSize;
//! use rechunk_updater::{ChunkedBlobUpdater, UpdateOptions};
//!
//! let store = InMemoryBlobStore::new();
//! let chunk_size = ChunkSize::new(2).unwrap();
//! store
//!     .create_blob(7u64, b"1234", chunk_size, ChecksumAlgorithm::Md5, Document::new())
//!     .unwrap();
//!
//! let patch = Patch::new().set("name", "a.bin");
//! let options = UpdateOptions::with_chunk_size(2);
//! let report = ChunkedBlobUpdater::default()
//!     .update(&store, &7, b"123456", Some(patch), &options)
//!     .unwrap();
//! assert_eq!(report.chunk_count, 3);
//! assert_eq!(store.metadata(&7).unwrap().unwrap()["length"], 6);
//! ```
//!
//! Concurrent updates of the same object must be serialized by the caller;
//! see [`KeyLock`] and [`ChunkedBlobUpdater::update_locked`].

pub mod config;
pub mod error;
pub mod lock;
pub mod payload;
pub mod reader;
pub mod saga;
pub mod updater;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{UpdateOptions, UpdaterConfig};
pub use error::{UpdateError, UpdateResult};
pub use lock::{KeyGuard, KeyLock, KeyedLocks};
pub use payload::Payload;
pub use reader::BlobReader;
pub use saga::{SagaStep, StepReport, UpdateReport};
pub use updater::{effective_patch, ChunkedBlobUpdater};

use rechunk_store::{ChunkStore, Patch};
use rechunk_types::ObjectKey;

/// Update `id` in `store` with the default [`UpdaterConfig`].
pub fn update<K, S>(
    store: &S,
    id: &K,
    payload: &[u8],
    patch: Option<Patch>,
    options: &UpdateOptions,
) -> UpdateResult<UpdateReport>
where
    K: ObjectKey,
    S: ChunkStore<K> + ?Sized,
{
    ChunkedBlobUpdater::default().update(store, id, payload, patch, options)
}
