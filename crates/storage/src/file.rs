//! A single-file JSON backend for operator tooling and offline runs.
//!
//! The file holds one object per table:
//!
//! ```json
//! {
//!   "Lookup.Group.Snapshot": {
//!     "Engineers[0]": "[\"u2\",\"u3\",\"u4\"]"
//!   }
//! }
//! ```
//!
//! The whole document is loaded on open and rewritten after every mutation.
//! File I/O is synchronous; this backend is meant for small stores driven by
//! one process at a time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::traits::{check_width, KeyValueBackend};

type Document = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    doc: Mutex<Document>,
    max_value_len: Option<usize>,
}

impl JsonFileBackend {
    /// Open `path`. A missing file is an empty store and is created on first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let doc = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Document::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), tables = doc.len(), "opened json store");
        Ok(Self {
            path,
            doc: Mutex::new(doc),
            max_value_len: None,
        })
    }

    pub fn with_max_value_len(mut self, max: usize) -> Self {
        self.max_value_len = Some(max);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Document>, StorageError> {
        self.doc
            .lock()
            .map_err(|_| StorageError::Backend("json store lock poisoned".to_string()))
    }

    fn flush(&self, doc: &Document) -> Result<(), StorageError> {
        let body = serde_json::to_string_pretty(doc)?;
        std::fs::write(&self.path, body)?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueBackend for JsonFileBackend {
    async fn get(&self, table: &str, key: &str) -> Result<Option<String>, StorageError> {
        let doc = self.lock()?;
        Ok(doc.get(table).and_then(|t| t.get(key)).cloned())
    }

    async fn put(&self, table: &str, key: &str, value: &str) -> Result<(), StorageError> {
        check_width(self.max_value_len, table, key, value)?;
        let mut doc = self.lock()?;
        let mut staged = doc.clone();
        staged
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self.flush(&staged)?;
        *doc = staged;
        Ok(())
    }

    async fn delete(&self, table: &str, key: &str) -> Result<bool, StorageError> {
        let mut doc = self.lock()?;
        if !doc.get(table).is_some_and(|t| t.contains_key(key)) {
            return Ok(false);
        }
        let mut staged = doc.clone();
        if let Some(t) = staged.get_mut(table) {
            t.remove(key);
            if t.is_empty() {
                staged.remove(table);
            }
        }
        self.flush(&staged)?;
        *doc = staged;
        Ok(true)
    }

    fn max_value_len(&self) -> Option<usize> {
        self.max_value_len
    }
}
