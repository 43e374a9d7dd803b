//! Reconciliation orchestrator.
//!
//! One `run` per membership event:
//!
//! ```text
//! Start -> ResolveTarget -> ComputeDelta -> ApplyDelta -> PersistSnapshot -> Done
//!               |                |              |               |
//!               +----------------+--------------+---------------+--> Failed
//! ```
//!
//! `ResolveTarget` ends the run as `Skipped` when the group has no role yet.
//! The snapshot is written only after every grant and revoke succeeded, so an
//! aborted run leaves the previous snapshot in place and the next event for
//! the group recomputes the same delta.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rolesync_storage::KeyValueBackend;
use serde::Serialize;

use crate::applier::{ApplyReport, GrantAction, GrantApplier, RoleGrantOutcome};
use crate::codec::ChunkCodec;
use crate::config::{ConfigResolver, EngineConfig, DEFAULT_ROLE_PREFIX};
use crate::differ::{diff, MembershipDelta};
use crate::error::{ErrorClass, ReconcileError};
use crate::event::MembershipEvent;
use crate::platform::{GrantService, Role, RoleDirectory};
use crate::snapshot::{SnapshotError, SnapshotStore};

/// Anything that can reconcile one membership event.
#[async_trait]
pub trait Reconciler: Send + Sync {
    async fn run(&self, event: &MembershipEvent) -> RunVerdict;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    ResolveTarget,
    ComputeDelta,
    ApplyDelta,
    PersistSnapshot,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::ResolveTarget => "resolve_target",
            RunPhase::ComputeDelta => "compute_delta",
            RunPhase::ApplyDelta => "apply_delta",
            RunPhase::PersistSnapshot => "persist_snapshot",
        };
        f.write_str(name)
    }
}

/// Counts of members changed or skipped during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub added: usize,
    pub removed: usize,
    pub skipped: usize,
}

impl RunSummary {
    fn from_report(report: &ApplyReport) -> Self {
        Self {
            added: report.applied(GrantAction::Grant),
            removed: report.applied(GrantAction::Revoke),
            skipped: report.skipped(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added={}, removed={}, skipped={}",
            self.added, self.removed, self.skipped
        )
    }
}

#[derive(Debug)]
pub enum RunVerdict {
    Success(RunSummary),
    /// Nothing to do, e.g. the group has no corresponding role yet.
    Skipped { reason: String },
    Failed {
        phase: RunPhase,
        summary: RunSummary,
        error: ReconcileError,
    },
}

impl RunVerdict {
    pub fn is_success(&self) -> bool {
        matches!(self, RunVerdict::Success(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RunVerdict::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunVerdict::Failed { .. })
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            RunVerdict::Success(summary) | RunVerdict::Failed { summary, .. } => Some(summary),
            RunVerdict::Skipped { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ReconcileError> {
        match self {
            RunVerdict::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Short machine-readable status: `success`, `skipped`, or `failed`.
    pub fn status(&self) -> &'static str {
        match self {
            RunVerdict::Success(_) => "success",
            RunVerdict::Skipped { .. } => "skipped",
            RunVerdict::Failed { .. } => "failed",
        }
    }

    /// JSON rendering for tooling output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            RunVerdict::Success(summary) => serde_json::json!({
                "status": "success",
                "summary": summary,
            }),
            RunVerdict::Skipped { reason } => serde_json::json!({
                "status": "skipped",
                "reason": reason,
            }),
            RunVerdict::Failed {
                phase,
                summary,
                error,
            } => serde_json::json!({
                "status": "failed",
                "phase": phase,
                "summary": summary,
                "class": error.class(),
                "error": error.to_string(),
            }),
        }
    }
}

impl fmt::Display for RunVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunVerdict::Success(summary) => write!(f, "success: {summary}"),
            RunVerdict::Skipped { reason } => write!(f, "skipped: {reason}"),
            RunVerdict::Failed {
                phase,
                summary,
                error,
            } => write!(
                f,
                "failed during {phase} ({summary}) [{}]: {error}",
                error.class()
            ),
        }
    }
}

/// Load `event.group`'s snapshot from `table` and diff the event against it.
/// Returns the deduplicated current members alongside the delta.
pub async fn compute_delta<B: KeyValueBackend>(
    snapshots: &SnapshotStore<B>,
    table: &str,
    event: &MembershipEvent,
) -> Result<(BTreeSet<String>, MembershipDelta), ReconcileError> {
    let current: BTreeSet<String> = event.members.iter().cloned().collect();
    let previous: BTreeSet<String> = snapshots
        .load(table, &event.group)
        .await?
        .into_iter()
        .collect();
    let delta = diff(&current, &previous);
    Ok((current, delta))
}

/// Dry run: the delta `event` would apply. Needs no role lookup and writes
/// nothing.
pub async fn preview<B: KeyValueBackend>(
    config: &dyn ConfigResolver,
    snapshots: &SnapshotStore<B>,
    event: &MembershipEvent,
) -> Result<MembershipDelta, ReconcileError> {
    let table = config.snapshot_table(&event.resource)?;
    let (_, delta) = compute_delta(snapshots, &table, event).await?;
    Ok(delta)
}

/// The group's role plus where its snapshot lives.
#[derive(Debug, Clone)]
struct Target {
    role: Role,
    table: String,
}

pub struct Orchestrator<B> {
    roles: Arc<dyn RoleDirectory>,
    applier: GrantApplier,
    snapshots: SnapshotStore<B>,
    config: Arc<dyn ConfigResolver>,
    role_prefix: String,
}

impl<B: KeyValueBackend> Orchestrator<B> {
    pub fn new(
        roles: Arc<dyn RoleDirectory>,
        grants: Arc<dyn GrantService>,
        snapshots: SnapshotStore<B>,
        config: Arc<dyn ConfigResolver>,
    ) -> Self {
        Self {
            roles,
            applier: GrantApplier::new(grants),
            snapshots,
            config,
            role_prefix: DEFAULT_ROLE_PREFIX.to_string(),
        }
    }

    /// Build the snapshot store and prefix from an `EngineConfig`, which also
    /// serves as the resource resolver.
    pub fn from_config(
        config: Arc<EngineConfig>,
        backend: Arc<B>,
        roles: Arc<dyn RoleDirectory>,
        grants: Arc<dyn GrantService>,
    ) -> Result<Self, ReconcileError> {
        config.validate()?;
        let codec = ChunkCodec::new(config.chunk_width).map_err(SnapshotError::from)?;
        let snapshots = SnapshotStore::new(backend, codec)?.with_scan_ceiling(config.scan_ceiling);
        let role_prefix = config.role_prefix.clone();
        Ok(Self::new(roles, grants, snapshots, config).with_role_prefix(&role_prefix))
    }

    pub fn with_role_prefix(mut self, prefix: &str) -> Self {
        self.role_prefix = prefix.to_string();
        self
    }

    /// Role name a directory group maps to.
    pub fn role_name(&self, group: &str) -> String {
        format!("{}{}", self.role_prefix, group)
    }

    pub fn snapshots(&self) -> &SnapshotStore<B> {
        &self.snapshots
    }

    /// Compute the delta `event` would apply, without touching the platform
    /// or the snapshot.
    pub async fn preview(&self, event: &MembershipEvent) -> Result<MembershipDelta, ReconcileError> {
        preview(self.config.as_ref(), &self.snapshots, event).await
    }

    async fn resolve_target(
        &self,
        event: &MembershipEvent,
    ) -> Result<Option<Target>, ReconcileError> {
        // Configuration problems surface before any lookup or diffing.
        let table = self.config.snapshot_table(&event.resource)?;
        let role_name = self.role_name(&event.group);
        let role = self
            .roles
            .find_role_by_name(&role_name)
            .await
            .map_err(ReconcileError::Directory)?;
        Ok(role.map(|role| Target { role, table }))
    }

    async fn compute_delta(
        &self,
        table: &str,
        event: &MembershipEvent,
    ) -> Result<(BTreeSet<String>, MembershipDelta), ReconcileError> {
        compute_delta(&self.snapshots, table, event).await
    }

    fn fail(
        &self,
        event: &MembershipEvent,
        phase: RunPhase,
        summary: RunSummary,
        error: ReconcileError,
    ) -> RunVerdict {
        let class = error.class();
        match class {
            ErrorClass::RetryLater => tracing::error!(
                resource = %event.resource,
                group = %event.group,
                phase = %phase,
                error = %error,
                "reconciliation aborted, snapshot left unchanged for retry"
            ),
            ErrorClass::Configuration | ErrorClass::Corruption => tracing::error!(
                resource = %event.resource,
                group = %event.group,
                phase = %phase,
                class = %class,
                error = %error,
                "reconciliation aborted, administrator action required"
            ),
        }
        RunVerdict::Failed {
            phase,
            summary,
            error,
        }
    }
}

#[async_trait]
impl<B: KeyValueBackend> Reconciler for Orchestrator<B> {
    async fn run(&self, event: &MembershipEvent) -> RunVerdict {
        tracing::info!(
            resource = %event.resource,
            group = %event.group,
            members = event.members.len(),
            "reconciliation started"
        );

        // ── ResolveTarget ─────────────────────────────────────────────
        let target = match self.resolve_target(event).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                let role_name = self.role_name(&event.group);
                tracing::warn!(
                    group = %event.group,
                    role = %role_name,
                    "no role for group, skipping"
                );
                return RunVerdict::Skipped {
                    reason: format!("no role named '{role_name}'"),
                };
            }
            Err(e) => {
                return self.fail(event, RunPhase::ResolveTarget, RunSummary::default(), e)
            }
        };

        // ── ComputeDelta ──────────────────────────────────────────────
        let (current, delta) = match self.compute_delta(&target.table, event).await {
            Ok(computed) => computed,
            Err(e) => return self.fail(event, RunPhase::ComputeDelta, RunSummary::default(), e),
        };
        tracing::debug!(
            group = %event.group,
            to_add = delta.to_add.len(),
            to_remove = delta.to_remove.len(),
            "delta computed"
        );

        // ── ApplyDelta ────────────────────────────────────────────────
        let report = self.applier.apply(&target.role.key, &delta).await;
        let summary = RunSummary::from_report(&report);
        if let Some(failure) = report.failure() {
            if let RoleGrantOutcome::Failed(source) = &failure.outcome {
                let error = ReconcileError::Grant {
                    member: failure.member.clone(),
                    action: failure.action,
                    source: source.clone(),
                };
                return self.fail(event, RunPhase::ApplyDelta, summary, error);
            }
        }

        // ── PersistSnapshot ───────────────────────────────────────────
        let members: Vec<String> = current.into_iter().collect();
        if let Err(e) = self
            .snapshots
            .store(&target.table, &event.group, &members)
            .await
        {
            return self.fail(event, RunPhase::PersistSnapshot, summary, e.into());
        }

        tracing::info!(
            resource = %event.resource,
            group = %event.group,
            role = %target.role.name,
            added = summary.added,
            removed = summary.removed,
            skipped = summary.skipped,
            "reconciliation finished"
        );
        RunVerdict::Success(summary)
    }
}
