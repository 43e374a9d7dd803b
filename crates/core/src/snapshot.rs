//! Chunked membership snapshots on a key/value backend.
//!
//! A group's snapshot lives at `group[0]`, `group[1]`, ... in one table. The
//! sequence ends at the first missing index; there is no stored count. Every
//! scan is bounded by `scan_ceiling` probes so a backend that never reports
//! "not found" cannot loop forever.
//!
//! `store` deletes the old records before writing the new ones. The two steps
//! are not atomic: a failure in between leaves the group without a snapshot,
//! and the next run treats every current member as new.

use std::sync::Arc;

use rolesync_storage::{ChunkKey, KeyValueBackend, StorageError};
use serde::Serialize;

use crate::codec::{ChunkCodec, CodecError};

/// Default bound on records probed per scan.
pub const DEFAULT_SCAN_CEILING: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// `ceiling` consecutive records existed without a terminating gap.
    #[error(
        "snapshot scan for '{group}' in table '{table}' hit the ceiling of {ceiling} records without finding the end"
    )]
    ScanCeilingExceeded {
        table: String,
        group: String,
        ceiling: usize,
    },

    /// The new list needs more records than a later scan could read back.
    #[error("snapshot for '{group}' needs {chunks} records, scan ceiling is {ceiling}")]
    TooLarge {
        group: String,
        chunks: usize,
        ceiling: usize,
    },

    /// The backend's value column is narrower than the codec's chunk width.
    #[error("chunk width {width} exceeds backend value limit {max}")]
    WidthExceedsBackend { width: usize, max: usize },
}

/// What a `store` call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreReceipt {
    /// Records removed from the previous snapshot.
    pub deleted: usize,
    /// Records written for the new snapshot.
    pub written: usize,
}

pub struct SnapshotStore<B> {
    backend: Arc<B>,
    codec: ChunkCodec,
    scan_ceiling: usize,
}

impl<B> Clone for SnapshotStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            codec: self.codec,
            scan_ceiling: self.scan_ceiling,
        }
    }
}

impl<B: KeyValueBackend> SnapshotStore<B> {
    /// Fails if the backend cannot hold a full-width chunk.
    pub fn new(backend: Arc<B>, codec: ChunkCodec) -> Result<Self, SnapshotError> {
        if let Some(max) = backend.max_value_len() {
            if codec.width() > max {
                return Err(SnapshotError::WidthExceedsBackend {
                    width: codec.width(),
                    max,
                });
            }
        }
        Ok(Self {
            backend,
            codec,
            scan_ceiling: DEFAULT_SCAN_CEILING,
        })
    }

    pub fn with_scan_ceiling(mut self, ceiling: usize) -> Self {
        self.scan_ceiling = ceiling;
        self
    }

    pub fn scan_ceiling(&self) -> usize {
        self.scan_ceiling
    }

    pub fn codec(&self) -> &ChunkCodec {
        &self.codec
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Read the last recorded member list for `group`.
    ///
    /// Returns an empty list when `group[0]` does not exist.
    pub async fn load(&self, table: &str, group: &str) -> Result<Vec<String>, SnapshotError> {
        let chunks = self.read_chunks(table, group).await?;
        match self.codec.decode(&chunks) {
            Ok(members) => {
                tracing::debug!(
                    table = %table,
                    group = %group,
                    records = chunks.len(),
                    members = members.len(),
                    "loaded snapshot"
                );
                Ok(members)
            }
            Err(e) if e.is_empty_input() => {
                tracing::debug!(table = %table, group = %group, "no snapshot recorded");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the snapshot for `group` with `members`.
    ///
    /// All existing records are deleted first so a shrinking list leaves no
    /// stale trailing records behind.
    pub async fn store(
        &self,
        table: &str,
        group: &str,
        members: &[String],
    ) -> Result<StoreReceipt, SnapshotError> {
        let records = self.codec.records(group, members)?;
        if records.len() >= self.scan_ceiling {
            return Err(SnapshotError::TooLarge {
                group: group.to_string(),
                chunks: records.len(),
                ceiling: self.scan_ceiling,
            });
        }

        let deleted = self.clear(table, group).await?;
        for record in &records {
            self.backend.put(table, &record.key, &record.value).await?;
        }

        tracing::debug!(
            table = %table,
            group = %group,
            deleted,
            written = records.len(),
            members = members.len(),
            "stored snapshot"
        );
        Ok(StoreReceipt {
            deleted,
            written: records.len(),
        })
    }

    /// Delete every record of `group`'s snapshot. Returns how many existed.
    pub async fn clear(&self, table: &str, group: &str) -> Result<usize, SnapshotError> {
        for index in 0..self.scan_ceiling {
            let key = ChunkKey::new(group, index).to_string();
            if !self.backend.delete(table, &key).await? {
                return Ok(index);
            }
        }
        Err(self.ceiling_exceeded(table, group))
    }

    /// Raw chunk values in index order, stopping at the first missing index.
    pub async fn read_chunks(&self, table: &str, group: &str) -> Result<Vec<String>, SnapshotError> {
        let mut chunks = Vec::new();
        for index in 0..self.scan_ceiling {
            let key = ChunkKey::new(group, index).to_string();
            match self.backend.get(table, &key).await? {
                Some(value) => chunks.push(value),
                None => return Ok(chunks),
            }
        }
        Err(self.ceiling_exceeded(table, group))
    }

    fn ceiling_exceeded(&self, table: &str, group: &str) -> SnapshotError {
        tracing::error!(
            table = %table,
            group = %group,
            ceiling = self.scan_ceiling,
            "snapshot scan did not terminate"
        );
        SnapshotError::ScanCeilingExceeded {
            table: table.to_string(),
            group: group.to_string(),
            ceiling: self.scan_ceiling,
        }
    }
}
