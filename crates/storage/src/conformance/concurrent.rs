use std::future::Future;
use std::sync::Arc;

use super::{TestResult, TABLE};
use crate::{KeyValueBackend, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_writes_different_groups_all_land",
        concurrent_writes_different_groups_all_land(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_deletes_report_single_removal",
        concurrent_deletes_report_single_removal(factory).await,
    ));

    results
}

// ── Different groups: no interference ───────────────────────────────────────

/// N tasks each write three chunks for their own group. Every record must be
/// readable afterwards; runs for different groups share nothing but the backend.
async fn concurrent_writes_different_groups_all_land<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            for idx in 0..3 {
                s.put(TABLE, &format!("group-{i}[{idx}]"), &format!("{i}:{idx}"))
                    .await?;
            }
            Ok::<(), StorageError>(())
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error: {e}"))?;
    }

    for i in 0..N {
        for idx in 0..3 {
            let key = format!("group-{i}[{idx}]");
            let got = storage
                .get(TABLE, &key)
                .await
                .map_err(|e| format!("get {key}: {e}"))?;
            let expected = format!("{i}:{idx}");
            if got.as_deref() != Some(expected.as_str()) {
                return Err(format!("{key}: expected {expected:?}, got {got:?}"));
            }
        }
    }
    Ok(())
}

// ── Same key: exactly one delete observes the record ────────────────────────

async fn concurrent_deletes_report_single_removal<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    storage
        .put(TABLE, "g[0]", "v")
        .await
        .map_err(|e| format!("put: {e}"))?;

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move { s.delete(TABLE, "g[0]").await }));
    }

    let mut removed = 0usize;
    for handle in handles {
        let existed = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error: {e}"))?;
        if existed {
            removed += 1;
        }
    }

    if removed != 1 {
        return Err(format!("expected exactly 1 delete to find the record, got {removed}"));
    }
    Ok(())
}
