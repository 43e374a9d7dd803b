use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::traits::{check_width, KeyValueBackend};

type Tables = BTreeMap<(String, String), String>;

/// In-process backend. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Tables>>,
    max_value_len: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that rejects values longer than `max` characters.
    pub fn with_max_value_len(max: usize) -> Self {
        Self {
            inner: Arc::default(),
            max_value_len: Some(max),
        }
    }

    /// Number of records across all tables.
    pub fn len(&self) -> usize {
        self.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys present in `table`, in sorted order.
    pub fn keys(&self, table: &str) -> Vec<String> {
        self.lock()
            .map(|t| {
                t.keys()
                    .filter(|(tbl, _)| tbl == table)
                    .map(|(_, key)| key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Backend("memory backend lock poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get(&self, table: &str, key: &str) -> Result<Option<String>, StorageError> {
        let tables = self.lock()?;
        Ok(tables.get(&(table.to_string(), key.to_string())).cloned())
    }

    async fn put(&self, table: &str, key: &str, value: &str) -> Result<(), StorageError> {
        check_width(self.max_value_len, table, key, value)?;
        let mut tables = self.lock()?;
        tables.insert((table.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn delete(&self, table: &str, key: &str) -> Result<bool, StorageError> {
        let mut tables = self.lock()?;
        Ok(tables
            .remove(&(table.to_string(), key.to_string()))
            .is_some())
    }

    fn max_value_len(&self) -> Option<usize> {
        self.max_value_len
    }
}
