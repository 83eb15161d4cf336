use serde_json::Value;

use crate::error::{UpdateError, UpdateResult};

/// New content for a blob.
///
/// Typed callers pass `&[u8]` straight to the updater. `Payload` is the
/// entry point for loosely typed input, where anything other than a byte
/// string must be refused before the store is touched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Accept a JSON string (its UTF-8 bytes) or an array of integers in
    /// `0..=255`.
    pub fn from_value(value: &Value) -> UpdateResult<Self> {
        match value {
            Value::String(s) => Ok(Self(s.as_bytes().to_vec())),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    item.as_u64()
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or_else(|| {
                            UpdateError::InvalidPayload(format!(
                                "element {i} is not a byte: {item}"
                            ))
                        })
                })
                .collect::<UpdateResult<Vec<u8>>>()
                .map(Self),
            other => Err(UpdateError::InvalidPayload(format!(
                "expected a byte string, got {other}"
            ))),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
