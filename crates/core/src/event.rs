//! Membership change events and the sources that deliver them.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::orchestrator::{Reconciler, RunVerdict};

/// One trigger for a reconciliation run.
///
/// `members` are platform-internal identifiers. Resolving raw directory
/// references (and dropping unresolvable ones) happens before the event is
/// built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEvent {
    /// Resource identifier of the directory deployment.
    pub resource: String,
    pub group: String,
    #[serde(default)]
    pub members: Vec<String>,
}

impl MembershipEvent {
    pub fn new<I, S>(resource: &str, group: &str, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource: resource.to_string(),
            group: group.to_string(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

/// Delivers membership events, serialized per group.
#[async_trait]
pub trait DirectoryEventSource: Send {
    /// Next event, or `None` once the source is exhausted.
    async fn next_event(&mut self) -> Option<MembershipEvent>;
}

#[async_trait]
impl DirectoryEventSource for VecDeque<MembershipEvent> {
    async fn next_event(&mut self) -> Option<MembershipEvent> {
        self.pop_front()
    }
}

#[async_trait]
impl DirectoryEventSource for tokio::sync::mpsc::Receiver<MembershipEvent> {
    async fn next_event(&mut self) -> Option<MembershipEvent> {
        self.recv().await
    }
}

/// Run every event from `source` through `reconciler`, in arrival order.
pub async fn drain<S, R>(source: &mut S, reconciler: &R) -> Vec<(MembershipEvent, RunVerdict)>
where
    S: DirectoryEventSource + ?Sized,
    R: Reconciler + ?Sized,
{
    let mut verdicts = Vec::new();
    while let Some(event) = source.next_event().await {
        let verdict = reconciler.run(&event).await;
        verdicts.push((event, verdict));
    }
    verdicts
}
