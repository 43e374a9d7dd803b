use std::fmt;

use rolesync_storage::StorageError;
use serde::Serialize;

use crate::applier::GrantAction;
use crate::config::ConfigError;
use crate::platform::PlatformError;
use crate::snapshot::SnapshotError;

/// How a failed run should be handled by whoever watches the verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Platform or backend trouble. Nothing was persisted; the next event for
    /// the group recomputes and retries the same delta.
    RetryLater,
    /// Deployment configuration is wrong. Retrying will not help.
    Configuration,
    /// Stored snapshot data is unreadable or the backend's not-found
    /// signalling is broken.
    Corruption,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::RetryLater => write!(f, "retry_later"),
            ErrorClass::Configuration => write!(f, "configuration"),
            ErrorClass::Corruption => write!(f, "corruption"),
        }
    }
}

/// Root cause of a failed reconciliation run.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("role lookup failed: {0}")]
    Directory(#[source] PlatformError),

    #[error("{action} of '{member}' failed: {source}")]
    Grant {
        member: String,
        action: GrantAction,
        #[source]
        source: PlatformError,
    },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl ReconcileError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ReconcileError::Config(_) => ErrorClass::Configuration,
            ReconcileError::Directory(_) | ReconcileError::Grant { .. } => ErrorClass::RetryLater,
            ReconcileError::Snapshot(e) => match e {
                SnapshotError::Storage(e) => storage_class(e),
                SnapshotError::Codec(_) | SnapshotError::ScanCeilingExceeded { .. } => {
                    ErrorClass::Corruption
                }
                SnapshotError::TooLarge { .. } | SnapshotError::WidthExceedsBackend { .. } => {
                    ErrorClass::Configuration
                }
            },
        }
    }
}

fn storage_class(error: &StorageError) -> ErrorClass {
    if error.is_unavailable() {
        return ErrorClass::RetryLater;
    }
    match error {
        StorageError::ValueTooLong { .. } => ErrorClass::Configuration,
        StorageError::Serialization(_) => ErrorClass::Corruption,
        _ => ErrorClass::RetryLater,
    }
}
