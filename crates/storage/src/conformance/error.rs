//! Not-found and value-width conformance tests.

use std::future::Future;

use super::{expect_value, TestResult, TABLE};
use crate::{KeyValueBackend, StorageError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "error",
        "get_missing_key_is_none",
        get_missing_key_is_none(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "get_missing_table_is_none",
        get_missing_table_is_none(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "empty_string_is_not_missing",
        empty_string_is_not_missing(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "delete_missing_returns_false",
        delete_missing_returns_false(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "value_at_width_is_accepted",
        value_at_width_is_accepted(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "value_over_width_is_rejected",
        value_over_width_is_rejected(factory).await,
    ));

    results
}

async fn get_missing_key_is_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.put(TABLE, "g[0]", "v").await.map_err(|e| e.to_string())?;
    expect_value(&s, TABLE, "g[1]", None).await
}

async fn get_missing_table_is_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    expect_value(&s, "no_such_table", "g[0]", None).await
}

async fn empty_string_is_not_missing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.put(TABLE, "g[0]", "").await.map_err(|e| e.to_string())?;
    expect_value(&s, TABLE, "g[0]", Some("")).await?;
    let existed = s.delete(TABLE, "g[0]").await.map_err(|e| e.to_string())?;
    if !existed {
        return Err("delete of an empty-string record returned false".to_string());
    }
    Ok(())
}

async fn delete_missing_returns_false<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let existed = s.delete(TABLE, "g[0]").await.map_err(|e| e.to_string())?;
    if existed {
        return Err("delete of a missing key returned true".to_string());
    }
    Ok(())
}

async fn value_at_width_is_accepted<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let width = s.max_value_len().unwrap_or(4000);
    let value = "x".repeat(width);
    s.put(TABLE, "g[0]", &value)
        .await
        .map_err(|e| format!("value of exactly {width} chars rejected: {e}"))?;
    expect_value(&s, TABLE, "g[0]", Some(&value)).await
}

async fn value_over_width_is_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let Some(width) = s.max_value_len() else {
        // Unbounded backends have nothing to reject.
        return Ok(());
    };
    s.put(TABLE, "g[0]", "kept")
        .await
        .map_err(|e| e.to_string())?;
    match s.put(TABLE, "g[0]", &"x".repeat(width + 1)).await {
        Err(StorageError::ValueTooLong { len, max, .. }) => {
            if len != width + 1 || max != width {
                return Err(format!(
                    "ValueTooLong reported len={len} max={max}, expected len={} max={width}",
                    width + 1
                ));
            }
        }
        Err(e) => return Err(format!("expected ValueTooLong, got: {e}")),
        Ok(()) => return Err(format!("value of {} chars accepted", width + 1)),
    }
    // A rejected put must leave the previous value untouched.
    expect_value(&s, TABLE, "g[0]", Some("kept")).await
}
