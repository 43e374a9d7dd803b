//! # rolesync core
//!
//! Keeps a platform role's grants in line with a directory group's member
//! list.
//!
//! Each membership event is reconciled against the member list recorded on
//! the previous successful run. That snapshot is stored as JSON, split into
//! fixed-width records on a key/value backend. The difference between the two
//! lists becomes one grant or revoke call per member, and the new list
//! replaces the snapshot only once every call has succeeded.
//!
//! ```text
//! MembershipEvent ─► Orchestrator ─► ConfigResolver   (snapshot table)
//!                         │       ─► RoleDirectory    (prefix + group)
//!                         │       ─► SnapshotStore    (load previous)
//!                         │       ─► diff             (to_add / to_remove)
//!                         │       ─► GrantApplier     (grant / revoke)
//!                         └─────► SnapshotStore    (store current)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use rolesync_core::{EngineConfig, MembershipEvent, Orchestrator, Reconciler, Traced};
//!
//! let config = Arc::new(EngineConfig::from_path(Path::new("rolesync.toml"))?);
//! let engine = Traced::new(Orchestrator::from_config(config, backend, roles, grants)?);
//!
//! let verdict = engine
//!     .run(&MembershipEvent::new("corp-directory", "Engineers", ["u2", "u3", "u4"]))
//!     .await;
//! println!("{verdict}");
//! ```

pub mod applier;
pub mod codec;
pub mod config;
pub mod differ;
pub mod error;
pub mod event;
pub mod middleware;
pub mod orchestrator;
pub mod platform;
pub mod snapshot;

pub use applier::{ApplyReport, GrantAction, GrantApplier, MemberOutcome, RoleGrantOutcome};
pub use codec::{ChunkCodec, CodecError};
pub use config::{ConfigError, ConfigResolver, EngineConfig, ResourceConfig};
pub use differ::{diff, MembershipDelta};
pub use error::{ErrorClass, ReconcileError};
pub use event::{drain, DirectoryEventSource, MembershipEvent};
pub use middleware::{GroupSerialized, Traced};
pub use orchestrator::{
    compute_delta, preview, Orchestrator, Reconciler, RunPhase, RunSummary, RunVerdict,
};
pub use platform::{GrantResponse, GrantService, PlatformError, RevokeResponse, Role, RoleDirectory};
pub use snapshot::{SnapshotError, SnapshotStore, StoreReceipt, DEFAULT_SCAN_CEILING};
