use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rechunk_crypto::ChecksumAlgorithm;
use rechunk_types::{fields, ChunkSize, ObjectKey};
use serde_json::Value;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::patch::{Document, Patch};
use crate::traits::{BlobSource, ChunkSelector, ChunkStore};

type ChunkMap<K> = HashMap<K, BTreeMap<u64, Vec<u8>>>;

/// In-memory chunked blob store.
///
/// Metadata documents and chunk records live in two separate maps, each
/// behind its own `RwLock`. Trait operations only ever take one of them,
/// mirroring a backend with two independent collections and no
/// cross-collection transaction. Intended for tests and embedding.
pub struct InMemoryBlobStore<K: ObjectKey> {
    files: RwLock<HashMap<K, Document>>,
    chunks: RwLock<ChunkMap<K>>,
}

impl<K: ObjectKey> InMemoryBlobStore<K> {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            chunks: RwLock::new(HashMap::new()),
        }
    }

    /// Store a new blob: chunk records plus a metadata record holding
    /// `fields` and the derived `length`, `chunkSize` and `checksum`.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if `id` already has metadata.
    pub fn create_blob(
        &self,
        id: K,
        data: &[u8],
        chunk_size: ChunkSize,
        algorithm: ChecksumAlgorithm,
        mut metadata: Document,
    ) -> StoreResult<()> {
        let mut files = self.files_write()?;
        if files.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }

        let records: BTreeMap<u64, Vec<u8>> = data
            .chunks(chunk_size.as_usize())
            .enumerate()
            .map(|(n, chunk)| (n as u64, chunk.to_vec()))
            .collect();
        debug!(%id, chunks = records.len(), "creating blob");
        if !records.is_empty() {
            self.chunks_write()?.insert(id.clone(), records);
        }

        metadata.insert(fields::LENGTH.to_string(), Value::from(data.len() as u64));
        metadata.insert(fields::CHUNK_SIZE.to_string(), Value::from(chunk_size.get()));
        metadata.insert(
            fields::CHECKSUM.to_string(),
            Value::String(algorithm.digest(data).to_hex()),
        );
        files.insert(id, metadata);
        Ok(())
    }

    /// Insert or replace a raw metadata record without touching chunks.
    pub fn put_metadata(&self, id: K, metadata: Document) -> StoreResult<()> {
        self.files_write()?.insert(id, metadata);
        Ok(())
    }

    /// Delete the metadata record of `id`. Returns `true` if it existed.
    ///
    /// Chunks are left in place, like deleting a file document directly.
    pub fn remove_metadata(&self, id: &K) -> StoreResult<bool> {
        Ok(self.files_write()?.remove(id).is_some())
    }

    /// Number of metadata records.
    pub fn file_count(&self) -> usize {
        self.files.read().expect("lock poisoned").len()
    }

    /// Number of chunk records stored for `id`.
    pub fn chunk_count(&self, id: &K) -> usize {
        self.chunks
            .read()
            .expect("lock poisoned")
            .get(id)
            .map_or(0, BTreeMap::len)
    }

    /// Number of chunk records across all objects.
    pub fn total_chunks(&self) -> usize {
        self.chunks
            .read()
            .expect("lock poisoned")
            .values()
            .map(BTreeMap::len)
            .sum()
    }

    /// Remove every record.
    pub fn clear(&self) {
        self.files.write().expect("lock poisoned").clear();
        self.chunks.write().expect("lock poisoned").clear();
    }

    fn files_read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<K, Document>>> {
        self.files
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn files_write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<K, Document>>> {
        self.files
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn chunks_read(&self) -> StoreResult<RwLockReadGuard<'_, ChunkMap<K>>> {
        self.chunks
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn chunks_write(&self) -> StoreResult<RwLockWriteGuard<'_, ChunkMap<K>>> {
        self.chunks
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }
}

impl<K: ObjectKey> Default for InMemoryBlobStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ObjectKey> ChunkStore<K> for InMemoryBlobStore<K> {
    fn upsert_chunk(&self, id: &K, index: u64, data: &[u8]) -> StoreResult<()> {
        self.chunks_write()?
            .entry(id.clone())
            .or_default()
            .insert(index, data.to_vec());
        Ok(())
    }

    fn remove_chunks(&self, id: &K, selector: ChunkSelector) -> StoreResult<u64> {
        let mut chunks = self.chunks_write()?;
        let Some(records) = chunks.get_mut(id) else {
            return Ok(0);
        };

        let before = records.len();
        match selector {
            ChunkSelector::All => records.clear(),
            ChunkSelector::From(n) => {
                records.split_off(&n);
            }
        }
        let removed = (before - records.len()) as u64;

        if records.is_empty() {
            chunks.remove(id);
        }
        Ok(removed)
    }

    fn apply_metadata_patch(&self, id: &K, patch: &Patch) -> StoreResult<u64> {
        let mut files = self.files_write()?;
        match files.get_mut(id) {
            Some(record) => {
                patch.apply_to(record)?;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

impl<K: ObjectKey> BlobSource<K> for InMemoryBlobStore<K> {
    fn metadata(&self, id: &K) -> StoreResult<Option<Document>> {
        Ok(self.files_read()?.get(id).cloned())
    }

    fn chunk_indices(&self, id: &K) -> StoreResult<Vec<u64>> {
        Ok(self
            .chunks_read()?
            .get(id)
            .map(|records| records.keys().copied().collect())
            .unwrap_or_default())
    }

    fn read_chunk(&self, id: &K, index: u64) -> StoreResult<Option<Vec<u8>>> {
        Ok(self
            .chunks_read()?
            .get(id)
            .and_then(|records| records.get(&index).cloned()))
    }

    fn read_chunks(&self, id: &K) -> StoreResult<Vec<(u64, Vec<u8>)>> {
        Ok(self
            .chunks_read()?
            .get(id)
            .map(|records| records.iter().map(|(n, d)| (*n, d.clone())).collect())
            .unwrap_or_default())
    }
}

impl<K: ObjectKey> std::fmt::Debug for InMemoryBlobStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("file_count", &self.file_count())
            .field("chunk_count", &self.total_chunks())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cs(n: u64) -> ChunkSize {
        ChunkSize::new(n).unwrap()
    }

    fn seeded(data: &[u8], chunk_size: u64) -> InMemoryBlobStore<String> {
        let store = InMemoryBlobStore::new();
        store
            .create_blob(
                "f".to_string(),
                data,
                cs(chunk_size),
                ChecksumAlgorithm::Md5,
                Document::new(),
            )
            .unwrap();
        store
    }

    fn id() -> String {
        "f".to_string()
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    #[test]
    fn create_blob_writes_chunks_and_metadata() {
        let store = seeded(b"12345", 2);
        assert_eq!(store.chunk_count(&id()), 3);
        assert_eq!(store.read_chunk(&id(), 2).unwrap().unwrap(), b"5");

        let meta = store.metadata(&id()).unwrap().unwrap();
        assert_eq!(meta["length"], json!(5));
        assert_eq!(meta["chunkSize"], json!(2));
        assert_eq!(meta["checksum"], json!("827ccb0eea8a706c4c34a16891f84e7b"));
    }

    #[test]
    fn create_blob_twice_rejected() {
        let store = seeded(b"1234", 2);
        let err = store
            .create_blob(id(), b"x", cs(2), ChecksumAlgorithm::Md5, Document::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(k) if k == "f"));
    }

    #[test]
    fn create_empty_blob_has_no_chunks() {
        let store = seeded(b"", 2);
        assert_eq!(store.chunk_count(&id()), 0);
        assert_eq!(store.file_count(), 1);
    }

    // -----------------------------------------------------------------------
    // Chunk writes and removes
    // -----------------------------------------------------------------------

    #[test]
    fn upsert_overwrites() {
        let store = seeded(b"1234", 2);
        store.upsert_chunk(&id(), 0, b"ab").unwrap();
        store.upsert_chunk(&id(), 0, b"ab").unwrap();
        assert_eq!(store.read_chunk(&id(), 0).unwrap().unwrap(), b"ab");
        assert_eq!(store.chunk_count(&id()), 2);
    }

    #[test]
    fn remove_tail_only() {
        let store = seeded(b"123456", 2);
        assert_eq!(store.remove_chunks(&id(), ChunkSelector::From(1)).unwrap(), 2);
        assert_eq!(store.chunk_indices(&id()).unwrap(), vec![0]);
    }

    #[test]
    fn remove_all() {
        let store = seeded(b"123456", 2);
        assert_eq!(store.remove_chunks(&id(), ChunkSelector::All).unwrap(), 3);
        assert_eq!(store.total_chunks(), 0);
        assert!(store.read_chunks(&id()).unwrap().is_empty());
    }

    #[test]
    fn remove_is_scoped_to_object() {
        let store = seeded(b"1234", 2);
        store.upsert_chunk(&"g".to_string(), 0, b"zz").unwrap();
        store.remove_chunks(&id(), ChunkSelector::All).unwrap();
        assert_eq!(store.chunk_count(&"g".to_string()), 1);
    }

    #[test]
    fn remove_missing_object_is_noop() {
        let store: InMemoryBlobStore<u64> = InMemoryBlobStore::new();
        assert_eq!(store.remove_chunks(&7, ChunkSelector::All).unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // Metadata patches
    // -----------------------------------------------------------------------

    #[test]
    fn patch_existing_record() {
        let store = seeded(b"1234", 2);
        let affected = store
            .apply_metadata_patch(&id(), &Patch::new().set("name", "a.bin"))
            .unwrap();
        assert_eq!(affected, 1);
        assert_eq!(store.metadata(&id()).unwrap().unwrap()["name"], json!("a.bin"));
    }

    #[test]
    fn patch_missing_record_affects_nothing() {
        let store: InMemoryBlobStore<String> = InMemoryBlobStore::new();
        let affected = store
            .apply_metadata_patch(&id(), &Patch::new().set("name", "a"))
            .unwrap();
        assert_eq!(affected, 0);
        assert_eq!(store.file_count(), 0);
    }

    #[test]
    fn invalid_patch_propagates() {
        let store = seeded(b"1234", 2);
        let patch = Patch::new().set("length", 1).unset("length");
        assert!(store.apply_metadata_patch(&id(), &patch).is_err());
    }

    #[test]
    fn remove_metadata_keeps_chunks() {
        let store = seeded(b"1234", 2);
        assert!(store.remove_metadata(&id()).unwrap());
        assert!(store.metadata(&id()).unwrap().is_none());
        assert_eq!(store.chunk_count(&id()), 2);
    }

    // -----------------------------------------------------------------------
    // Utility
    // -----------------------------------------------------------------------

    #[test]
    fn clear_and_debug() {
        let store = seeded(b"1234", 2);
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryBlobStore"));
        assert!(debug.contains("chunk_count: 2"));
        store.clear();
        assert_eq!(store.file_count(), 0);
        assert_eq!(store.total_chunks(), 0);
    }
}
