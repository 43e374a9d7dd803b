//! File-backed identity platform for offline runs.
//!
//! ```json
//! {
//!   "roles": {
//!     "ORG Engineers": { "key": "role-eng", "members": ["u2", "u3"] }
//!   }
//! }
//! ```
//!
//! Grants and revokes mutate the in-memory document; `save` writes it back.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rolesync_core::{
    GrantResponse, GrantService, PlatformError, RevokeResponse, Role, RoleDirectory,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub(crate) enum PlatformFileError {
    #[error("error reading platform file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error writing platform file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing platform file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("error encoding platform state: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("duplicate role key '{0}'")]
    DuplicateKey(String),

    #[error("platform state lock poisoned")]
    Poisoned,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PlatformDoc {
    #[serde(default)]
    roles: BTreeMap<String, RoleEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RoleEntry {
    key: String,
    #[serde(default)]
    members: BTreeSet<String>,
}

#[derive(Debug)]
pub(crate) struct FilePlatform {
    path: PathBuf,
    doc: Mutex<PlatformDoc>,
}

impl FilePlatform {
    pub(crate) fn open(path: &Path) -> Result<Self, PlatformFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| PlatformFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let doc: PlatformDoc =
            serde_json::from_str(&content).map_err(|source| PlatformFileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut keys = BTreeSet::new();
        for entry in doc.roles.values() {
            if !keys.insert(entry.key.as_str()) {
                return Err(PlatformFileError::DuplicateKey(entry.key.clone()));
            }
        }

        tracing::debug!(path = %path.display(), roles = doc.roles.len(), "loaded platform file");
        Ok(Self {
            path: path.to_path_buf(),
            doc: Mutex::new(doc),
        })
    }

    pub(crate) fn save(&self) -> Result<(), PlatformFileError> {
        let doc = self.doc.lock().map_err(|_| PlatformFileError::Poisoned)?;
        let body = serde_json::to_string_pretty(&*doc).map_err(PlatformFileError::Encode)?;
        std::fs::write(&self.path, body + "\n").map_err(|source| PlatformFileError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, PlatformDoc>, PlatformError> {
        self.doc
            .lock()
            .map_err(|_| PlatformError::Other("platform state lock poisoned".to_string()))
    }
}

fn holders<'a>(
    doc: &'a mut PlatformDoc,
    role_key: &str,
) -> Result<&'a mut BTreeSet<String>, PlatformError> {
    doc.roles
        .values_mut()
        .find(|entry| entry.key == role_key)
        .map(|entry| &mut entry.members)
        .ok_or_else(|| PlatformError::Rejected {
            reason: format!("no role with key '{role_key}'"),
        })
}

#[async_trait]
impl RoleDirectory for FilePlatform {
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, PlatformError> {
        let doc = self.lock()?;
        Ok(doc.roles.get(name).map(|entry| Role {
            key: entry.key.clone(),
            name: name.to_string(),
        }))
    }
}

#[async_trait]
impl GrantService for FilePlatform {
    async fn grant(&self, role_key: &str, member: &str) -> Result<GrantResponse, PlatformError> {
        let mut doc = self.lock()?;
        if holders(&mut doc, role_key)?.insert(member.to_string()) {
            Ok(GrantResponse::Granted)
        } else {
            Ok(GrantResponse::AlreadyGranted)
        }
    }

    async fn revoke(&self, role_key: &str, member: &str) -> Result<RevokeResponse, PlatformError> {
        let mut doc = self.lock()?;
        if holders(&mut doc, role_key)?.remove(member) {
            Ok(RevokeResponse::Revoked)
        } else {
            Ok(RevokeResponse::NotGranted)
        }
    }
}
