use std::fmt;
use std::str::FromStr;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Digest algorithm used for a blob's `checksum` field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// MD5, the digest GridFS-style readers expect in file metadata.
    #[default]
    Md5,
    /// BLAKE3, 32-byte output.
    Blake3,
}

impl ChecksumAlgorithm {
    /// Hash a complete payload.
    pub fn digest(self, data: &[u8]) -> Checksum {
        let bytes = match self {
            Self::Md5 => Md5::digest(data).to_vec(),
            Self::Blake3 => blake3::hash(data).as_bytes().to_vec(),
        };
        Checksum {
            algorithm: self,
            bytes,
        }
    }

    /// Digest length in bytes.
    pub fn output_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Blake3 => 32,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "md5" => Ok(Self::Md5),
            "blake3" => Ok(Self::Blake3),
            other => Err(ChecksumError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// A digest over a full payload, tagged with the algorithm that produced it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Checksum {
    algorithm: ChecksumAlgorithm,
    bytes: Vec<u8>,
}

impl Checksum {
    /// Parse a lowercase or uppercase hex digest produced by `algorithm`.
    pub fn from_hex(algorithm: ChecksumAlgorithm, s: &str) -> Result<Self, ChecksumError> {
        let bytes = hex::decode(s).map_err(|e| ChecksumError::InvalidHex(e.to_string()))?;
        if bytes.len() != algorithm.output_len() {
            return Err(ChecksumError::InvalidLength {
                algorithm,
                expected: algorithm.output_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self { algorithm, bytes })
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex, the form stored in metadata records.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Recompute the digest over `data` and compare.
    pub fn verify(&self, data: &[u8]) -> bool {
        self.algorithm.digest(data) == *self
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({}:{})", self.algorithm, self.to_hex())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Errors from checksum parsing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("unknown checksum algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("invalid hex digest: {0}")]
    InvalidHex(String),

    #[error("invalid {algorithm} digest length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        algorithm: ChecksumAlgorithm,
        expected: usize,
        actual: usize,
    },
}
