use std::path::Path;

use rechunk_crypto::ChecksumAlgorithm;
use rechunk_types::{fields, ChunkSize, TypeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{UpdateError, UpdateResult};

/// Process-wide settings for [`ChunkedBlobUpdater`](crate::ChunkedBlobUpdater).
///
/// ```toml
/// default_chunk_size = 262144
/// checksum = "md5"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Chunk size used when a call does not request one.
    pub default_chunk_size: ChunkSize,
    /// Digest written to the `checksum` metadata field.
    pub checksum: ChecksumAlgorithm,
}

impl UpdaterConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> UpdateResult<Self> {
        toml::from_str(text).map_err(|e| UpdateError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> UpdateResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> UpdateResult<String> {
        toml::to_string(self).map_err(|e| UpdateError::Config(e.to_string()))
    }
}

/// Per-call options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOptions {
    /// Bytes per chunk. `None` uses the configured default; values `<= 0`
    /// are rejected.
    pub chunk_size: Option<i64>,
}

impl UpdateOptions {
    pub fn with_chunk_size(chunk_size: i64) -> Self {
        Self {
            chunk_size: Some(chunk_size),
        }
    }

    /// Read options from a loosely typed document such as `{"chunkSize": 2}`.
    ///
    /// A `null` chunk size counts as absent. Fractional numbers, strings and
    /// other non-integers are rejected. Unrecognised keys are ignored.
    pub fn from_value(value: &Value) -> UpdateResult<Self> {
        let Value::Object(map) = value else {
            return Err(UpdateError::InvalidOptions(format!(
                "expected an object, got {value}"
            )));
        };

        let chunk_size = match map.get(fields::CHUNK_SIZE) {
            None | Some(Value::Null) => None,
            Some(raw) => match raw.as_i64() {
                Some(n) => Some(n),
                None => return Err(TypeError::InvalidChunkSize(raw.to_string()).into()),
            },
        };
        Ok(Self { chunk_size })
    }

    /// The chunk size to use for this call.
    pub fn resolve_chunk_size(&self, default: ChunkSize) -> UpdateResult<ChunkSize> {
        match self.chunk_size {
            None => Ok(default),
            Some(n) => Ok(ChunkSize::try_from(n)?),
        }
    }
}
