use std::fmt;

use serde::{Deserialize, Serialize};

/// The key of one snapshot chunk: `group[index]`.
///
/// Records for a group form a contiguous, zero-based sequence. The first
/// missing index terminates it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkKey {
    pub group: String,
    pub index: usize,
}

impl ChunkKey {
    pub fn new(group: impl Into<String>, index: usize) -> Self {
        Self {
            group: group.into(),
            index,
        }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.group, self.index)
    }
}

/// One `(key, value)` pair as written to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub key: String,
    pub value: String,
}

impl ChunkRecord {
    pub fn new(key: &ChunkKey, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }
}
