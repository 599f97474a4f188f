//! Keyspace ids and key ranges
//!
//! A keyspace id is the opaque routing key a row is sharded by. Shards own
//! contiguous, half-open ranges of keyspace ids:
//!
//! ```text
//!      -80            80-c0          c0-
//! [min ... 0x80) [0x80 ... 0xc0) [0xc0 ... max]
//! ```
//!
//! An empty `start` is the minimum key, an empty `end` is past the maximum
//! key. Key ranges are written the way shards are named: `"-80"`, `"40-80"`,
//! `"80-"`, and `"-"` for the whole keyspace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when decoding keys
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Invalid hex key: {0}")]
    InvalidHex(String),

    #[error("Invalid key range: {0}")]
    InvalidKeyRange(String),
}

/// Routing key of a row
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct KeyspaceId(Vec<u8>);

impl KeyspaceId {
    /// Create from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Big-endian encoding of a numeric sharding key
    pub fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes().to_vec())
    }

    /// Create from hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        hex::decode(hex_str)
            .map(Self)
            .map_err(|_| KeyError::InvalidHex(hex_str.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for KeyspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for KeyspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyspaceId({})", self.to_hex())
    }
}

impl From<Vec<u8>> for KeyspaceId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Half-open range `[start, end)` of keyspace ids
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct KeyRange {
    pub start: KeyspaceId,
    pub end: KeyspaceId,
}

impl KeyRange {
    pub fn new(start: KeyspaceId, end: KeyspaceId) -> Self {
        Self { start, end }
    }

    /// The range covering every keyspace id
    pub fn full() -> Self {
        Self::default()
    }

    /// Parse shard-name notation such as `"40-80"`
    pub fn parse(input: &str) -> Result<Self, KeyError> {
        let (start, end) = input
            .split_once('-')
            .ok_or_else(|| KeyError::InvalidKeyRange(input.to_string()))?;
        if end.contains('-') {
            return Err(KeyError::InvalidKeyRange(input.to_string()));
        }
        let range = Self {
            start: KeyspaceId::from_hex(start)?,
            end: KeyspaceId::from_hex(end)?,
        };
        if !range.end.is_empty() && range.start >= range.end {
            return Err(KeyError::InvalidKeyRange(input.to_string()));
        }
        Ok(range)
    }

    /// Whether the range has no upper bound
    pub fn is_unbounded(&self) -> bool {
        self.end.is_empty()
    }

    pub fn contains(&self, id: &KeyspaceId) -> bool {
        self.start <= *id && (self.end.is_empty() || *id < self.end)
    }

    pub fn intersects(&self, other: &KeyRange) -> bool {
        (self.end.is_empty() || other.start < self.end)
            && (other.end.is_empty() || self.start < other.end)
    }
}

impl FromStr for KeyRange {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl fmt::Debug for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyRange({})", self)
    }
}
