//! Reconciler decorators.
//!
//! Cross-cutting behaviour wraps a `Reconciler` instead of living inside the
//! orchestrator: `Traced` adds a span and timing, `GroupSerialized` keeps runs
//! for the same group from interleaving.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use tracing::Instrument;

use crate::event::MembershipEvent;
use crate::orchestrator::{Reconciler, RunVerdict};

/// Runs the inner reconciler inside a `reconcile` span and logs the verdict
/// with the elapsed time.
pub struct Traced<R> {
    inner: R,
}

impl<R> Traced<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[async_trait]
impl<R: Reconciler> Reconciler for Traced<R> {
    async fn run(&self, event: &MembershipEvent) -> RunVerdict {
        let span = tracing::info_span!(
            "reconcile",
            resource = %event.resource,
            group = %event.group
        );
        let started = Instant::now();
        let verdict = self.inner.run(event).instrument(span.clone()).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        span.in_scope(|| match &verdict {
            RunVerdict::Success(summary) => {
                tracing::info!(elapsed_ms, %summary, "run succeeded")
            }
            RunVerdict::Skipped { reason } => {
                tracing::info!(elapsed_ms, reason = %reason, "run skipped")
            }
            RunVerdict::Failed {
                phase,
                summary,
                error,
            } => tracing::warn!(
                elapsed_ms,
                phase = %phase,
                %summary,
                class = %error.class(),
                "run failed"
            ),
        });
        verdict
    }
}

/// Serializes runs per group name.
///
/// Snapshot replacement and grant calls are not transactional against each
/// other, so two runs for one group must never overlap. Runs for different
/// groups proceed in parallel.
pub struct GroupSerialized<R> {
    inner: R,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<R> GroupSerialized<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Number of groups with a run in flight or queued.
    pub fn active_groups(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_for(&self, group: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(group.to_string()).or_default())
    }

    fn release(&self, group: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Map entry plus ours: nobody else is waiting.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(group);
        }
    }
}

#[async_trait]
impl<R: Reconciler> Reconciler for GroupSerialized<R> {
    async fn run(&self, event: &MembershipEvent) -> RunVerdict {
        let lock = self.lock_for(&event.group);
        let verdict = {
            let _guard = lock.lock().await;
            self.inner.run(event).await
        };
        self.release(&event.group, lock);
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::RunSummary;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many runs per group overlap.
    #[derive(Default)]
    struct OverlapProbe {
        active: Mutex<HashMap<String, usize>>,
        max_same_group: AtomicUsize,
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Reconciler for OverlapProbe {
        async fn run(&self, event: &MembershipEvent) -> RunVerdict {
            {
                let mut active = self.active.lock().unwrap();
                let n = active.entry(event.group.clone()).or_default();
                *n += 1;
                self.max_same_group.fetch_max(*n, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            {
                let mut active = self.active.lock().unwrap();
                *active.get_mut(&event.group).unwrap() -= 1;
            }
            self.runs.fetch_add(1, Ordering::SeqCst);
            RunVerdict::Success(RunSummary::default())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_group_runs_never_overlap() {
        let reconciler = Arc::new(GroupSerialized::new(OverlapProbe::default()));

        let mut handles = Vec::new();
        for i in 0..8 {
            let r = reconciler.clone();
            let group = if i % 2 == 0 { "Engineers" } else { "Finance" };
            handles.push(tokio::spawn(async move {
                r.run(&MembershipEvent::new("corp", group, ["u1"])).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_success());
        }

        let probe = &reconciler.inner;
        assert_eq!(probe.runs.load(Ordering::SeqCst), 8);
        assert_eq!(probe.max_same_group.load(Ordering::SeqCst), 1);
        assert_eq!(reconciler.active_groups(), 0);
    }

    #[tokio::test]
    async fn traced_passes_verdict_through() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("debug")
            .try_init();
        let traced = Traced::new(OverlapProbe::default());
        let verdict = traced
            .run(&MembershipEvent::new("corp", "Engineers", ["u1"]))
            .await;
        assert!(verdict.is_success());
        assert_eq!(traced.into_inner().runs.load(Ordering::SeqCst), 1);
    }
}
