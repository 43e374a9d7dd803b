//! Engine configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! role_prefix = "ORG "
//! chunk_width = 4000
//! scan_ceiling = 10000
//!
//! [resources.corp-directory]
//! snapshot_table = "Lookup.Group.Snapshot"
//!
//! [resources.partner-directory]
//! snapshot_table = "Lookup.Partner.Snapshot"
//! ```
//!
//! Each `[resources.*]` section describes one directory deployment; events
//! name the resource they came from, and the resource decides which table
//! holds that deployment's snapshots.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::snapshot::DEFAULT_SCAN_CEILING;

/// Default role-name prefix: group `Engineers` maps to role `ORG Engineers`.
pub const DEFAULT_ROLE_PREFIX: &str = "ORG ";

/// Default chunk width, the platform's lookup-value column size.
pub const DEFAULT_CHUNK_WIDTH: usize = 4000;

/// Name of the resource attribute holding the snapshot table.
pub const SNAPSHOT_TABLE_ATTRIBUTE: &str = "snapshot_table";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no resource named '{0}' is configured")]
    UnknownResource(String),

    #[error("resource '{resource}' is missing the '{attribute}' attribute")]
    MissingAttribute { resource: String, attribute: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Supplies per-resource settings to the orchestrator.
pub trait ConfigResolver: Send + Sync {
    /// Name of the table holding snapshots for `resource`.
    fn snapshot_table(&self, resource: &str) -> Result<String, ConfigError>;
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Prepended to a group name to find its role.
    #[serde(default = "default_role_prefix")]
    pub role_prefix: String,
    /// Maximum characters per snapshot record.
    #[serde(default = "default_chunk_width")]
    pub chunk_width: usize,
    /// Maximum records probed when scanning a snapshot.
    #[serde(default = "default_scan_ceiling")]
    pub scan_ceiling: usize,
    /// Directory deployments, keyed by resource identifier.
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceConfig>,
}

/// `[resources.<id>]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub snapshot_table: Option<String>,
}

fn default_role_prefix() -> String {
    DEFAULT_ROLE_PREFIX.to_string()
}

fn default_chunk_width() -> usize {
    DEFAULT_CHUNK_WIDTH
}

fn default_scan_ceiling() -> usize {
    DEFAULT_SCAN_CEILING
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            role_prefix: default_role_prefix(),
            chunk_width: default_chunk_width(),
            scan_ceiling: default_scan_ceiling(),
            resources: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Read and validate a TOML configuration file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        content.parse()
    }

    /// Register a resource with its snapshot table.
    pub fn with_resource(mut self, resource: &str, snapshot_table: &str) -> Self {
        self.resources.insert(
            resource.to_string(),
            ResourceConfig {
                snapshot_table: Some(snapshot_table.to_string()),
            },
        );
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_width == 0 {
            return Err(ConfigError::Invalid(
                "chunk_width must be greater than zero".to_string(),
            ));
        }
        if self.scan_ceiling < 2 {
            return Err(ConfigError::Invalid(
                "scan_ceiling must allow at least one record".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::str::FromStr for EngineConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl ConfigResolver for EngineConfig {
    fn snapshot_table(&self, resource: &str) -> Result<String, ConfigError> {
        let entry = self
            .resources
            .get(resource)
            .ok_or_else(|| ConfigError::UnknownResource(resource.to_string()))?;
        match entry.snapshot_table.as_deref().map(str::trim) {
            Some(table) if !table.is_empty() => Ok(table.to_string()),
            _ => Err(ConfigError::MissingAttribute {
                resource: resource.to_string(),
                attribute: SNAPSHOT_TABLE_ATTRIBUTE.to_string(),
            }),
        }
    }
}
