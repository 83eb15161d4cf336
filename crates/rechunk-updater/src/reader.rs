use rechunk_crypto::{Checksum, ChecksumAlgorithm};
use rechunk_store::{BlobSource, Document};
use rechunk_types::{fields, ChunkLayout, ChunkSize, ObjectKey};
use serde_json::Value;
use tracing::debug;

use crate::error::{UpdateError, UpdateResult};

/// Reassembles a blob from its chunks and checks it against its metadata.
///
/// A successful read proves the invariants an update establishes: chunk
/// indices are exactly `0..n`, every chunk but the last is `chunkSize`
/// long, the total is `length` bytes and the bytes hash to `checksum`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlobReader {
    algorithm: ChecksumAlgorithm,
}

impl BlobReader {
    /// A reader expecting checksums produced by `algorithm`.
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Read and verify object `id`.
    pub fn read<K, S>(&self, store: &S, id: &K) -> UpdateResult<Vec<u8>>
    where
        K: ObjectKey,
        S: BlobSource<K> + ?Sized,
    {
        let corrupt = |reason: String| UpdateError::Corrupt {
            id: id.to_string(),
            reason,
        };

        let meta = store
            .metadata(id)
            .map_err(UpdateError::Read)?
            .ok_or_else(|| UpdateError::NotFound { id: id.to_string() })?;

        let length = u64_field(&meta, fields::LENGTH).map_err(corrupt)?;
        let chunk_size = u64_field(&meta, fields::CHUNK_SIZE)
            .and_then(|n| ChunkSize::new(n).map_err(|e| e.to_string()))
            .map_err(corrupt)?;
        let expected = checksum_field(&meta, self.algorithm).map_err(corrupt)?;
        let layout = ChunkLayout::new(length, chunk_size);

        let chunks = store.read_chunks(id).map_err(UpdateError::Read)?;
        if chunks.len() as u64 != layout.chunk_count() {
            return Err(corrupt(format!(
                "expected {} chunks for {length} bytes, found {}",
                layout.chunk_count(),
                chunks.len()
            )));
        }

        let mut bytes = Vec::with_capacity(chunks.iter().map(|(_, d)| d.len()).sum());
        for (expected_index, (index, data)) in chunks.into_iter().enumerate() {
            let expected_index = expected_index as u64;
            if index != expected_index {
                return Err(corrupt(format!("missing chunk {expected_index}")));
            }
            let expected_len = layout.chunk_len(index).unwrap_or(0);
            if data.len() as u64 != expected_len {
                return Err(corrupt(format!(
                    "chunk {index} holds {} bytes, expected {expected_len}",
                    data.len()
                )));
            }
            bytes.extend_from_slice(&data);
        }

        if !expected.verify(&bytes) {
            return Err(corrupt(format!(
                "checksum mismatch: metadata has {expected}, content hashes to {}",
                self.algorithm.digest(&bytes)
            )));
        }

        debug!(%id, length, "blob read");
        Ok(bytes)
    }
}

fn u64_field(meta: &Document, name: &str) -> Result<u64, String> {
    match meta.get(name) {
        Some(value) => value
            .as_u64()
            .ok_or_else(|| format!("field '{name}' is not a non-negative integer: {value}")),
        None => Err(format!("field '{name}' is missing")),
    }
}

fn checksum_field(meta: &Document, algorithm: ChecksumAlgorithm) -> Result<Checksum, String> {
    match meta.get(fields::CHECKSUM) {
        Some(Value::String(hex)) => Checksum::from_hex(algorithm, hex).map_err(|e| e.to_string()),
        Some(other) => Err(format!("field '{}' is not a string: {other}", fields::CHECKSUM)),
        None => Err(format!("field '{}' is missing", fields::CHECKSUM)),
    }
}
