//! Applies a membership delta to a role, one member per platform call.
//!
//! Each call is classified on its own:
//!
//! - "already granted" / "not granted" responses are skips: logged at warn
//!   and processing continues.
//! - any `PlatformError` is fatal: processing stops immediately and the
//!   remaining members are left untouched for the next run to retry.
//!
//! Adds are applied before removes, each in set order.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::differ::MembershipDelta;
use crate::platform::{GrantResponse, GrantService, PlatformError, RevokeResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantAction {
    Grant,
    Revoke,
}

impl fmt::Display for GrantAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantAction::Grant => write!(f, "grant"),
            GrantAction::Revoke => write!(f, "revoke"),
        }
    }
}

/// Result of one grant or revoke call.
#[derive(Debug, Clone)]
pub enum RoleGrantOutcome {
    Applied,
    SkippedAlreadyInDesiredState,
    Failed(PlatformError),
}

#[derive(Debug, Clone)]
pub struct MemberOutcome {
    pub member: String,
    pub action: GrantAction,
    pub outcome: RoleGrantOutcome,
}

/// Per-member outcomes of one `apply` call, in processing order.
///
/// At most one entry is `Failed`, and if present it is the last entry.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub entries: Vec<MemberOutcome>,
}

impl ApplyReport {
    /// The fatal outcome that stopped processing, if any.
    pub fn failure(&self) -> Option<&MemberOutcome> {
        self.entries
            .last()
            .filter(|e| matches!(e.outcome, RoleGrantOutcome::Failed(_)))
    }

    pub fn is_complete(&self) -> bool {
        self.failure().is_none()
    }

    /// Members actually changed by `action`.
    pub fn applied(&self, action: GrantAction) -> usize {
        self.entries
            .iter()
            .filter(|e| e.action == action && matches!(e.outcome, RoleGrantOutcome::Applied))
            .count()
    }

    /// Members already in the desired state, across both actions.
    pub fn skipped(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, RoleGrantOutcome::SkippedAlreadyInDesiredState))
            .count()
    }
}

pub struct GrantApplier {
    grants: Arc<dyn GrantService>,
}

impl GrantApplier {
    pub fn new(grants: Arc<dyn GrantService>) -> Self {
        Self { grants }
    }

    pub async fn apply(&self, role_key: &str, delta: &MembershipDelta) -> ApplyReport {
        let mut report = ApplyReport::default();

        for member in &delta.to_add {
            let outcome = match self.grants.grant(role_key, member).await {
                Ok(GrantResponse::Granted) => {
                    tracing::debug!(role = %role_key, member = %member, "granted");
                    RoleGrantOutcome::Applied
                }
                Ok(GrantResponse::AlreadyGranted) => {
                    tracing::warn!(role = %role_key, member = %member, "member already holds role, skipping");
                    RoleGrantOutcome::SkippedAlreadyInDesiredState
                }
                Err(e) => {
                    tracing::error!(role = %role_key, member = %member, error = %e, "grant failed");
                    RoleGrantOutcome::Failed(e)
                }
            };
            if record(&mut report, member, GrantAction::Grant, outcome) {
                return report;
            }
        }

        for member in &delta.to_remove {
            let outcome = match self.grants.revoke(role_key, member).await {
                Ok(RevokeResponse::Revoked) => {
                    tracing::debug!(role = %role_key, member = %member, "revoked");
                    RoleGrantOutcome::Applied
                }
                Ok(RevokeResponse::NotGranted) => {
                    tracing::warn!(role = %role_key, member = %member, "member does not hold role, skipping");
                    RoleGrantOutcome::SkippedAlreadyInDesiredState
                }
                Err(e) => {
                    tracing::error!(role = %role_key, member = %member, error = %e, "revoke failed");
                    RoleGrantOutcome::Failed(e)
                }
            };
            if record(&mut report, member, GrantAction::Revoke, outcome) {
                return report;
            }
        }

        report
    }
}

/// Push an entry; returns true if it was fatal.
fn record(
    report: &mut ApplyReport,
    member: &str,
    action: GrantAction,
    outcome: RoleGrantOutcome,
) -> bool {
    let fatal = matches!(outcome, RoleGrantOutcome::Failed(_));
    report.entries.push(MemberOutcome {
        member: member.to_string(),
        action,
        outcome,
    });
    fatal
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Mutex;

    // ── Mock grant service ────────────────────────────────────────────

    /// Scripted responses per (action, member); unscripted calls succeed.
    #[derive(Default)]
    struct ScriptedGrants {
        grant_script: HashMap<String, Result<GrantResponse, PlatformError>>,
        revoke_script: HashMap<String, Result<RevokeResponse, PlatformError>>,
        calls: Mutex<Vec<(GrantAction, String)>>,
    }

    impl ScriptedGrants {
        fn calls(&self) -> Vec<(GrantAction, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GrantService for ScriptedGrants {
        async fn grant(&self, _role_key: &str, member: &str) -> Result<GrantResponse, PlatformError> {
            self.calls
                .lock()
                .unwrap()
                .push((GrantAction::Grant, member.to_string()));
            self.grant_script
                .get(member)
                .cloned()
                .unwrap_or(Ok(GrantResponse::Granted))
        }

        async fn revoke(
            &self,
            _role_key: &str,
            member: &str,
        ) -> Result<RevokeResponse, PlatformError> {
            self.calls
                .lock()
                .unwrap()
                .push((GrantAction::Revoke, member.to_string()));
            self.revoke_script
                .get(member)
                .cloned()
                .unwrap_or(Ok(RevokeResponse::Revoked))
        }
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn delta(add: &[&str], remove: &[&str]) -> MembershipDelta {
        MembershipDelta {
            to_add: set(add),
            to_remove: set(remove),
        }
    }

    // ── Tests ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn one_call_per_member_adds_before_removes() {
        let grants = Arc::new(ScriptedGrants::default());
        let applier = GrantApplier::new(grants.clone());

        let report = applier.apply("role-1", &delta(&["b", "a"], &["c"])).await;

        assert!(report.is_complete());
        assert_eq!(report.applied(GrantAction::Grant), 2);
        assert_eq!(report.applied(GrantAction::Revoke), 1);
        assert_eq!(
            grants.calls(),
            vec![
                (GrantAction::Grant, "a".to_string()),
                (GrantAction::Grant, "b".to_string()),
                (GrantAction::Revoke, "c".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn already_granted_is_skipped_and_processing_continues() {
        let mut grants = ScriptedGrants::default();
        grants
            .grant_script
            .insert("a".to_string(), Ok(GrantResponse::AlreadyGranted));
        let grants = Arc::new(grants);
        let applier = GrantApplier::new(grants.clone());

        let report = applier.apply("role-1", &delta(&["a", "b"], &[])).await;

        assert!(report.is_complete());
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.applied(GrantAction::Grant), 1);
        assert_eq!(grants.calls().len(), 2);
    }

    #[tokio::test]
    async fn not_granted_is_skipped_on_revoke() {
        let mut grants = ScriptedGrants::default();
        grants
            .revoke_script
            .insert("x".to_string(), Ok(RevokeResponse::NotGranted));
        let applier = GrantApplier::new(Arc::new(grants));

        let report = applier.apply("role-1", &delta(&[], &["x", "y"])).await;

        assert!(report.is_complete());
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.applied(GrantAction::Revoke), 1);
    }

    #[tokio::test]
    async fn grant_error_stops_before_remaining_adds() {
        let mut grants = ScriptedGrants::default();
        grants.grant_script.insert(
            "b".to_string(),
            Err(PlatformError::Unavailable("connection reset".to_string())),
        );
        let grants = Arc::new(grants);
        let applier = GrantApplier::new(grants.clone());

        let report = applier.apply("role-1", &delta(&["a", "b", "c"], &["z"])).await;

        let failure = report.failure().expect("fatal outcome");
        assert_eq!(failure.member, "b");
        assert_eq!(failure.action, GrantAction::Grant);
        assert!(matches!(
            failure.outcome,
            RoleGrantOutcome::Failed(PlatformError::Unavailable(_))
        ));
        // "c" and the revoke of "z" were never attempted.
        assert_eq!(
            grants.calls(),
            vec![
                (GrantAction::Grant, "a".to_string()),
                (GrantAction::Grant, "b".to_string()),
            ]
        );
        assert_eq!(report.applied(GrantAction::Grant), 1);
    }

    #[tokio::test]
    async fn revoke_error_is_fatal() {
        let mut grants = ScriptedGrants::default();
        grants.revoke_script.insert(
            "y".to_string(),
            Err(PlatformError::Rejected {
                reason: "role is locked".to_string(),
            }),
        );
        let grants = Arc::new(grants);
        let applier = GrantApplier::new(grants.clone());

        let report = applier.apply("role-1", &delta(&["a"], &["x", "y", "z"])).await;

        let failure = report.failure().expect("fatal outcome");
        assert_eq!(failure.member, "y");
        assert_eq!(failure.action, GrantAction::Revoke);
        assert_eq!(grants.calls().len(), 3);
    }

    #[tokio::test]
    async fn skips_never_appear_as_failures() {
        let mut grants = ScriptedGrants::default();
        grants
            .grant_script
            .insert("a".to_string(), Ok(GrantResponse::AlreadyGranted));
        grants
            .revoke_script
            .insert("b".to_string(), Ok(RevokeResponse::NotGranted));
        let applier = GrantApplier::new(Arc::new(grants));

        let report = applier.apply("role-1", &delta(&["a"], &["b"])).await;

        assert!(report.failure().is_none());
        assert!(report
            .entries
            .iter()
            .all(|e| !matches!(e.outcome, RoleGrantOutcome::Failed(_))));
        assert_eq!(report.skipped(), 2);
    }

    #[tokio::test]
    async fn empty_delta_makes_no_calls() {
        let grants = Arc::new(ScriptedGrants::default());
        let applier = GrantApplier::new(grants.clone());
        let report = applier.apply("role-1", &MembershipDelta::default()).await;
        assert!(report.entries.is_empty());
        assert!(grants.calls().is_empty());
    }
}
