//! Store wrappers and fixtures shared by the updater tests.

use std::sync::Mutex;

use rechunk_crypto::ChecksumAlgorithm;
use rechunk_store::{
    ChunkSelector, ChunkStore, Document, InMemoryBlobStore, Patch, StoreError, StoreResult,
};
use rechunk_types::ChunkSize;

/// Install a debug-level test-writer subscriber; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// A store holding object `"f"` with `data` chunked at `chunk_size`.
pub fn seeded(data: &[u8], chunk_size: u64) -> InMemoryBlobStore<String> {
    let store = InMemoryBlobStore::new();
    store
        .create_blob(
            "f".to_string(),
            data,
            ChunkSize::new(chunk_size).unwrap(),
            ChecksumAlgorithm::Md5,
            Document::new(),
        )
        .unwrap();
    store
}

/// A store call as seen by [`FaultyStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Upsert(u64),
    Remove(ChunkSelector),
    Patch,
}

/// Which call [`FaultyStore`] fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    Upsert(u64),
    Prune,
    RemoveAll,
    Patch,
}

/// Wraps an [`InMemoryBlobStore`], records every call and fails the one
/// matching the configured [`Fault`].
pub struct FaultyStore {
    inner: InMemoryBlobStore<String>,
    fault: Mutex<Option<Fault>>,
    calls: Mutex<Vec<Call>>,
}

impl FaultyStore {
    pub fn new(inner: InMemoryBlobStore<String>) -> Self {
        Self {
            inner,
            fault: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &InMemoryBlobStore<String> {
        &self.inner
    }

    pub fn fail_on(&self, fault: Fault) {
        *self.fault.lock().unwrap() = Some(fault);
    }

    pub fn clear_fault(&self) {
        *self.fault.lock().unwrap() = None;
        self.calls.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call, matches: impl Fn(Fault) -> bool) -> StoreResult<()> {
        self.calls.lock().unwrap().push(call.clone());
        match *self.fault.lock().unwrap() {
            Some(fault) if matches(fault) => {
                Err(StoreError::Backend(format!("injected failure on {call:?}")))
            }
            _ => Ok(()),
        }
    }
}

impl ChunkStore<String> for FaultyStore {
    fn upsert_chunk(&self, id: &String, index: u64, data: &[u8]) -> StoreResult<()> {
        self.record(Call::Upsert(index), |f| f == Fault::Upsert(index))?;
        self.inner.upsert_chunk(id, index, data)
    }

    fn remove_chunks(&self, id: &String, selector: ChunkSelector) -> StoreResult<u64> {
        self.record(Call::Remove(selector), |f| match selector {
            ChunkSelector::All => f == Fault::RemoveAll,
            ChunkSelector::From(_) => f == Fault::Prune,
        })?;
        self.inner.remove_chunks(id, selector)
    }

    fn apply_metadata_patch(&self, id: &String, patch: &Patch) -> StoreResult<u64> {
        self.record(Call::Patch, |f| f == Fault::Patch)?;
        self.inner.apply_metadata_patch(id, patch)
    }
}
