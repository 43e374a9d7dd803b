//! Shared fakes for reconciliation tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rolesync_core::{
    EngineConfig, GrantResponse, GrantService, Orchestrator, PlatformError, RevokeResponse, Role,
    RoleDirectory,
};
use rolesync_storage::{KeyValueBackend, MemoryBackend, StorageError};

pub const RESOURCE: &str = "corp-directory";
pub const TABLE: &str = "Lookup.Group.Snapshot";

/// A platform call as observed by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Grant(String),
    Revoke(String),
}

/// Stateful identity platform: roles by name, grants per role key.
#[derive(Default)]
pub struct FakePlatform {
    roles: Mutex<BTreeMap<String, Role>>,
    grants: Mutex<BTreeMap<String, BTreeSet<String>>>,
    calls: Mutex<Vec<Call>>,
    failing_members: Mutex<HashSet<String>>,
    directory_down: AtomicBool,
}

impl FakePlatform {
    pub fn with_role(name: &str, key: &str) -> Arc<Self> {
        let platform = Self::default();
        platform.add_role(name, key);
        Arc::new(platform)
    }

    pub fn add_role(&self, name: &str, key: &str) {
        self.roles.lock().unwrap().insert(
            name.to_string(),
            Role {
                key: key.to_string(),
                name: name.to_string(),
            },
        );
    }

    /// Pretend `member` already holds `role_key` without recording a call.
    pub fn pre_grant(&self, role_key: &str, member: &str) {
        self.grants
            .lock()
            .unwrap()
            .entry(role_key.to_string())
            .or_default()
            .insert(member.to_string());
    }

    /// Grants and revokes for `member` fail with a platform error until cleared.
    pub fn fail_for(&self, member: &str) {
        self.failing_members
            .lock()
            .unwrap()
            .insert(member.to_string());
    }

    pub fn heal(&self) {
        self.failing_members.lock().unwrap().clear();
        self.directory_down.store(false, Ordering::SeqCst);
    }

    pub fn take_directory_down(&self) {
        self.directory_down.store(true, Ordering::SeqCst);
    }

    pub fn holders(&self, role_key: &str) -> BTreeSet<String> {
        self.grants
            .lock()
            .unwrap()
            .get(role_key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn check_member(&self, member: &str) -> Result<(), PlatformError> {
        if self.failing_members.lock().unwrap().contains(member) {
            return Err(PlatformError::Unavailable(format!(
                "grant store timed out for {member}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RoleDirectory for FakePlatform {
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, PlatformError> {
        if self.directory_down.load(Ordering::SeqCst) {
            return Err(PlatformError::Unavailable("role directory offline".to_string()));
        }
        Ok(self.roles.lock().unwrap().get(name).cloned())
    }
}

#[async_trait]
impl GrantService for FakePlatform {
    async fn grant(&self, role_key: &str, member: &str) -> Result<GrantResponse, PlatformError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Grant(member.to_string()));
        self.check_member(member)?;
        let mut grants = self.grants.lock().unwrap();
        if grants
            .entry(role_key.to_string())
            .or_default()
            .insert(member.to_string())
        {
            Ok(GrantResponse::Granted)
        } else {
            Ok(GrantResponse::AlreadyGranted)
        }
    }

    async fn revoke(&self, role_key: &str, member: &str) -> Result<RevokeResponse, PlatformError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Revoke(member.to_string()));
        self.check_member(member)?;
        let mut grants = self.grants.lock().unwrap();
        let removed = grants
            .get_mut(role_key)
            .map(|holders| holders.remove(member))
            .unwrap_or(false);
        if removed {
            Ok(RevokeResponse::Revoked)
        } else {
            Ok(RevokeResponse::NotGranted)
        }
    }
}

/// Wraps a backend and fails writes with `Unavailable` while switched off.
#[derive(Clone)]
pub struct SwitchableBackend {
    pub inner: MemoryBackend,
    writes_down: Arc<AtomicBool>,
}

impl SwitchableBackend {
    pub fn new(inner: MemoryBackend) -> Self {
        Self {
            inner,
            writes_down: Arc::default(),
        }
    }

    pub fn set_writes_down(&self, down: bool) {
        self.writes_down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueBackend for SwitchableBackend {
    async fn get(&self, table: &str, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(table, key).await
    }

    async fn put(&self, table: &str, key: &str, value: &str) -> Result<(), StorageError> {
        if self.writes_down.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("lookup store offline".to_string()));
        }
        self.inner.put(table, key, value).await
    }

    async fn delete(&self, table: &str, key: &str) -> Result<bool, StorageError> {
        self.inner.delete(table, key).await
    }
}

/// Every key exists.
pub struct BottomlessBackend;

#[async_trait]
impl KeyValueBackend for BottomlessBackend {
    async fn get(&self, _table: &str, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(Some("[".to_string()))
    }

    async fn put(&self, _table: &str, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    async fn delete(&self, _table: &str, _key: &str) -> Result<bool, StorageError> {
        Ok(true)
    }
}

pub fn config() -> EngineConfig {
    EngineConfig::default().with_resource(RESOURCE, TABLE)
}

pub fn orchestrator<B: KeyValueBackend>(
    config: EngineConfig,
    backend: Arc<B>,
    platform: &Arc<FakePlatform>,
) -> Orchestrator<B> {
    Orchestrator::from_config(
        Arc::new(config),
        backend,
        platform.clone(),
        platform.clone(),
    )
    .expect("valid test configuration")
}

pub fn set(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}
