use std::time::Instant;

use rechunk_crypto::Checksum;
use rechunk_store::{ChunkSelector, ChunkStore, Patch};
use rechunk_types::{fields, ChunkLayout, ChunkSize, ObjectKey};
use serde_json::Value;
use tracing::{debug, debug_span, warn};

use crate::config::{UpdateOptions, UpdaterConfig};
use crate::error::{UpdateError, UpdateResult};
use crate::lock::KeyLock;
use crate::payload::Payload;
use crate::saga::{SagaStep, StepReport, UpdateReport};

/// Replaces the content of an existing chunked blob in place.
///
/// An update is a saga of three ordered store calls with one compensating
/// action:
///
/// 1. upsert chunks `0..n` of the new payload, low index first
/// 2. remove chunks at index `n` and above
/// 3. apply the caller's patch, with `length`, `chunkSize` and `checksum`
///    forced into `$set`, to the metadata record
///
/// If step 3 touches no record, or fails, every chunk of the object is
/// removed before the error is returned. Failures in steps 1 and 2 are
/// returned directly; the metadata has not been touched and the whole
/// update can be retried.
///
/// The updater holds no per-object state. Concurrent updates of one object
/// must be serialized by the caller, e.g. with [`Self::update_locked`].
#[derive(Clone, Debug, Default)]
pub struct ChunkedBlobUpdater {
    config: UpdaterConfig,
}

impl ChunkedBlobUpdater {
    pub fn new(config: UpdaterConfig) -> Self {
        Self { config }
    }

    /// The current configuration.
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Replace the bytes of object `id` with `payload` and apply `patch` to
    /// its metadata.
    pub fn update<K, S>(
        &self,
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
        let started = Instant::now();

        let chunk_size = options.resolve_chunk_size(self.config.default_chunk_size)?;
        let layout = ChunkLayout::of(payload, chunk_size);
        let checksum = self.config.checksum.digest(payload);
        let patch = effective_patch(patch.unwrap_or_default(), &layout, &checksum);

        let _span = debug_span!(
            "update_blob",
            %id,
            length = layout.length(),
            chunk_size = chunk_size.get()
        )
        .entered();

        let mut steps = Vec::with_capacity(SagaStep::FORWARD.len());
        let mut pruned = 0;
        for step in SagaStep::FORWARD {
            let step_start = Instant::now();
            let outcome = match step {
                SagaStep::WriteChunks => write_chunks(store, id, payload, chunk_size),
                SagaStep::PruneTail => store
                    .remove_chunks(id, ChunkSelector::From(layout.chunk_count()))
                    .map_err(|source| UpdateError::Store { step, source }),
                SagaStep::ApplyPatch => apply_patch(store, id, &patch),
            };

            let records = match outcome {
                Ok(records) => records,
                Err(err) if step.is_compensated() => return Err(rollback(store, id, err)),
                Err(err) => return Err(err),
            };
            if step == SagaStep::PruneTail {
                pruned = records;
            }
            debug!(%step, records, "step complete");

            steps.push(StepReport {
                step,
                records,
                elapsed: step_start.elapsed(),
            });
        }

        debug!(
            chunks = layout.chunk_count(),
            pruned,
            checksum = %checksum,
            "blob updated"
        );
        Ok(UpdateReport {
            chunk_count: layout.chunk_count(),
            length: layout.length(),
            chunk_size,
            checksum,
            pruned,
            steps,
            elapsed: started.elapsed(),
        })
    }

    /// [`Self::update`] for loosely typed input, e.g. a decoded request body.
    ///
    /// The payload must be a JSON string or byte array, the patch a
    /// `$`-directive document and the options an object such as
    /// `{"chunkSize": 2}`. All three are validated before any store call.
    pub fn update_from_json<K, S>(
        &self,
        store: &S,
        id: &K,
        payload: &Value,
        patch: Option<Value>,
        options: Option<&Value>,
    ) -> UpdateResult<UpdateReport>
    where
        K: ObjectKey,
        S: ChunkStore<K> + ?Sized,
    {
        let payload = Payload::from_value(payload)?;
        let patch = patch
            .map(Patch::from_value)
            .transpose()
            .map_err(UpdateError::InvalidPatch)?;
        let options = match options {
            Some(value) => UpdateOptions::from_value(value)?,
            None => UpdateOptions::default(),
        };
        self.update(store, id, payload.as_bytes(), patch, &options)
    }

    /// [`Self::update`] while holding `locks` for `id`.
    pub fn update_locked<K, S, L>(
        &self,
        locks: &L,
        store: &S,
        id: &K,
        payload: &[u8],
        patch: Option<Patch>,
        options: &UpdateOptions,
    ) -> UpdateResult<UpdateReport>
    where
        K: ObjectKey,
        S: ChunkStore<K> + ?Sized,
        L: KeyLock<K> + ?Sized,
    {
        let _guard = locks.acquire(id)?;
        self.update(store, id, payload, patch, options)
    }
}

/// The caller's patch with the derived fields forced into `$set`.
///
/// Caller values for the derived keys are overwritten; every other field
/// and directive is kept as given.
pub fn effective_patch(mut patch: Patch, layout: &ChunkLayout, checksum: &Checksum) -> Patch {
    let set = patch.set_fields_mut();
    set.insert(fields::LENGTH.to_string(), Value::from(layout.length()));
    set.insert(
        fields::CHUNK_SIZE.to_string(),
        Value::from(layout.chunk_size().get()),
    );
    set.insert(fields::CHECKSUM.to_string(), Value::String(checksum.to_hex()));
    patch
}

fn write_chunks<K, S>(store: &S, id: &K, payload: &[u8], chunk_size: ChunkSize) -> UpdateResult<u64>
where
    K: ObjectKey,
    S: ChunkStore<K> + ?Sized,
{
    let mut written = 0;
    for (n, chunk) in payload.chunks(chunk_size.as_usize()).enumerate() {
        store
            .upsert_chunk(id, n as u64, chunk)
            .map_err(|source| UpdateError::Store {
                step: SagaStep::WriteChunks,
                source,
            })?;
        written += 1;
    }
    Ok(written)
}

fn apply_patch<K, S>(store: &S, id: &K, patch: &Patch) -> UpdateResult<u64>
where
    K: ObjectKey,
    S: ChunkStore<K> + ?Sized,
{
    let affected = store
        .apply_metadata_patch(id, patch)
        .map_err(|source| UpdateError::Store {
            step: SagaStep::ApplyPatch,
            source,
        })?;
    if affected == 0 {
        return Err(UpdateError::NotFound { id: id.to_string() });
    }
    Ok(affected)
}

/// Remove every chunk of `id` after the metadata patch failed.
///
/// Returns the error to surface: `original` if the removal succeeded,
/// otherwise both failures chained.
fn rollback<K, S>(store: &S, id: &K, original: UpdateError) -> UpdateError
where
    K: ObjectKey,
    S: ChunkStore<K> + ?Sized,
{
    match store.remove_chunks(id, ChunkSelector::All) {
        Ok(removed) => {
            warn!(%id, removed, error = %original, "metadata patch failed; removed chunks");
            original
        }
        Err(rollback) => {
            warn!(%id, error = %original, %rollback, "metadata patch failed; chunk rollback failed");
            UpdateError::RollbackFailed {
                id: id.to_string(),
                original: Box::new(original),
                rollback,
            }
        }
    }
}
