//! Identity-platform collaborators: role lookup and single-member grants.
//!
//! The engine only sees these traits. Implementations own transport,
//! authentication, timeouts, and retries; every call resolves to a clean
//! success, a classified "already in the desired state" response, or a
//! `PlatformError`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A platform role that mirrors one directory group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Platform-internal key passed to grant/revoke calls.
    pub key: String,
    /// Display name the role was looked up by.
    pub name: String,
}

/// Errors returned by platform collaborators.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlatformError {
    /// The platform could not be reached.
    #[error("identity platform unavailable: {0}")]
    Unavailable(String),

    /// The platform refused the request.
    #[error("identity platform rejected the request: {reason}")]
    Rejected { reason: String },

    #[error("identity platform error: {0}")]
    Other(String),
}

/// Result of a single-member grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantResponse {
    Granted,
    /// The member already held the role.
    AlreadyGranted,
}

/// Result of a single-member revoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeResponse {
    Revoked,
    /// The member did not hold the role.
    NotGranted,
}

/// Finds roles by display name.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Returns `Ok(None)` when no role has this name.
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, PlatformError>;
}

/// Grants and revokes a role for exactly one member per call.
#[async_trait]
pub trait GrantService: Send + Sync {
    async fn grant(&self, role_key: &str, member: &str) -> Result<GrantResponse, PlatformError>;

    async fn revoke(&self, role_key: &str, member: &str)
        -> Result<RevokeResponse, PlatformError>;
}
