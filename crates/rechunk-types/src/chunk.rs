use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Chunk size used when the caller does not ask for one (256 KiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 262_144;

/// Number of payload bytes stored per chunk record.
///
/// Always at least 1. Every chunk of an object holds exactly this many bytes
/// except the last, which may be shorter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u64")]
pub struct ChunkSize(u64);

impl ChunkSize {
    /// Validate a chunk size.
    pub fn new(bytes: u64) -> Result<Self, TypeError> {
        if bytes == 0 {
            return Err(TypeError::InvalidChunkSize(bytes.to_string()));
        }
        Ok(Self(bytes))
    }

    /// The size in bytes.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The size as a slice length.
    ///
    /// Saturates on targets where `usize` is narrower than the configured
    /// size; a chunk can never be longer than the payload anyway.
    pub fn as_usize(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self(DEFAULT_CHUNK_SIZE)
    }
}

impl TryFrom<i64> for ChunkSize {
    type Error = TypeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(TypeError::InvalidChunkSize(value.to_string()));
        }
        Ok(Self(value as u64))
    }
}

impl TryFrom<u64> for ChunkSize {
    type Error = TypeError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChunkSize> for u64 {
    fn from(size: ChunkSize) -> Self {
        size.0
    }
}

impl fmt::Debug for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkSize({})", self.0)
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ChunkLayout
// ---------------------------------------------------------------------------

/// How a payload of `length` bytes splits into chunks of `chunk_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkLayout {
    length: u64,
    chunk_size: ChunkSize,
}

impl ChunkLayout {
    pub fn new(length: u64, chunk_size: ChunkSize) -> Self {
        Self { length, chunk_size }
    }

    /// Layout of an in-memory payload.
    pub fn of(payload: &[u8], chunk_size: ChunkSize) -> Self {
        Self::new(payload.len() as u64, chunk_size)
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    /// `ceil(length / chunk_size)`; zero for an empty payload.
    pub fn chunk_count(&self) -> u64 {
        self.length.div_ceil(self.chunk_size.get())
    }

    /// Expected byte length of chunk `index`, or `None` past the end.
    pub fn chunk_len(&self, index: u64) -> Option<u64> {
        if index >= self.chunk_count() {
            return None;
        }
        let start = index * self.chunk_size.get();
        Some((self.length - start).min(self.chunk_size.get()))
    }

    /// Byte range of chunk `index` within the payload, or `None` past the end.
    pub fn byte_range(&self, index: u64) -> Option<Range<u64>> {
        let len = self.chunk_len(index)?;
        let start = index * self.chunk_size.get();
        Some(start..start + len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn size(n: u64) -> ChunkSize {
        ChunkSize::new(n).unwrap()
    }

    // -----------------------------------------------------------------------
    // ChunkSize validation
    // -----------------------------------------------------------------------

    #[test]
    fn zero_chunk_size_rejected() {
        assert_eq!(
            ChunkSize::new(0).unwrap_err(),
            TypeError::InvalidChunkSize("0".into())
        );
    }

    #[test]
    fn negative_chunk_size_rejected() {
        assert!(ChunkSize::try_from(-5i64).is_err());
        assert!(ChunkSize::try_from(0i64).is_err());
        assert_eq!(ChunkSize::try_from(7i64).unwrap().get(), 7);
    }

    #[test]
    fn default_is_256k() {
        assert_eq!(ChunkSize::default().get(), 262_144);
    }

    #[test]
    fn serde_validates() {
        let ok: ChunkSize = serde_json::from_str("1024").unwrap();
        assert_eq!(ok.get(), 1024);
        assert!(serde_json::from_str::<ChunkSize>("0").is_err());
        assert!(serde_json::from_str::<ChunkSize>("-1").is_err());
        assert!(serde_json::from_str::<ChunkSize>("2.5").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "1024");
    }

    // -----------------------------------------------------------------------
    // Layout arithmetic
    // -----------------------------------------------------------------------

    #[test]
    fn empty_payload_has_no_chunks() {
        let layout = ChunkLayout::new(0, size(2));
        assert_eq!(layout.chunk_count(), 0);
        assert_eq!(layout.chunk_len(0), None);
    }

    #[test]
    fn exact_multiple() {
        let layout = ChunkLayout::of(b"1234", size(2));
        assert_eq!(layout.chunk_count(), 2);
        assert_eq!(layout.chunk_len(1), Some(2));
        assert_eq!(layout.byte_range(1), Some(2..4));
    }

    #[test]
    fn short_last_chunk() {
        let layout = ChunkLayout::of(b"12345", size(2));
        assert_eq!(layout.chunk_count(), 3);
        assert_eq!(layout.chunk_len(2), Some(1));
        assert_eq!(layout.byte_range(2), Some(4..5));
        assert_eq!(layout.byte_range(3), None);
    }

    #[test]
    fn payload_smaller_than_chunk() {
        let layout = ChunkLayout::of(b"123456", size(262_144));
        assert_eq!(layout.chunk_count(), 1);
        assert_eq!(layout.chunk_len(0), Some(6));
    }

    proptest! {
        #[test]
        fn chunk_lengths_sum_to_length(length in 0u64..10_000, cs in 1u64..600) {
            let layout = ChunkLayout::new(length, size(cs));
            let total: u64 = (0..layout.chunk_count())
                .map(|i| layout.chunk_len(i).unwrap())
                .sum();
            prop_assert_eq!(total, length);
            for i in 0..layout.chunk_count() {
                let len = layout.chunk_len(i).unwrap();
                prop_assert!(len >= 1 && len <= cs);
                if i + 1 < layout.chunk_count() {
                    prop_assert_eq!(len, cs);
                }
            }
        }
    }
}
