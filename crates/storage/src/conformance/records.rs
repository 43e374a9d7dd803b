//! Basic record conformance tests.

use std::future::Future;

use super::{expect_value, TestResult, TABLE};
use crate::KeyValueBackend;

pub(super) async fn run_record_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "records",
        "put_then_get_returns_value",
        put_then_get_returns_value(factory).await,
    ));
    results.push(TestResult::from_result(
        "records",
        "put_overwrites_previous_value",
        put_overwrites_previous_value(factory).await,
    ));
    results.push(TestResult::from_result(
        "records",
        "delete_existing_returns_true",
        delete_existing_returns_true(factory).await,
    ));
    results.push(TestResult::from_result(
        "records",
        "deleted_key_reads_as_missing",
        deleted_key_reads_as_missing(factory).await,
    ));
    results.push(TestResult::from_result(
        "records",
        "tables_are_isolated",
        tables_are_isolated(factory).await,
    ));
    results.push(TestResult::from_result(
        "records",
        "chunk_keys_are_independent",
        chunk_keys_are_independent(factory).await,
    ));
    results.push(TestResult::from_result(
        "records",
        "json_text_stored_verbatim",
        json_text_stored_verbatim(factory).await,
    ));

    results
}

async fn put_then_get_returns_value<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.put(TABLE, "g[0]", "value")
        .await
        .map_err(|e| e.to_string())?;
    expect_value(&s, TABLE, "g[0]", Some("value")).await
}

async fn put_overwrites_previous_value<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.put(TABLE, "g[0]", "first")
        .await
        .map_err(|e| e.to_string())?;
    s.put(TABLE, "g[0]", "second")
        .await
        .map_err(|e| e.to_string())?;
    expect_value(&s, TABLE, "g[0]", Some("second")).await
}

async fn delete_existing_returns_true<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.put(TABLE, "g[0]", "v").await.map_err(|e| e.to_string())?;
    let existed = s.delete(TABLE, "g[0]").await.map_err(|e| e.to_string())?;
    if !existed {
        return Err("delete of an existing key returned false".to_string());
    }
    Ok(())
}

async fn deleted_key_reads_as_missing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.put(TABLE, "g[0]", "v").await.map_err(|e| e.to_string())?;
    s.delete(TABLE, "g[0]").await.map_err(|e| e.to_string())?;
    expect_value(&s, TABLE, "g[0]", None).await
}

async fn tables_are_isolated<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.put("table_a", "g[0]", "a")
        .await
        .map_err(|e| e.to_string())?;
    s.put("table_b", "g[0]", "b")
        .await
        .map_err(|e| e.to_string())?;
    expect_value(&s, "table_a", "g[0]", Some("a")).await?;
    expect_value(&s, "table_b", "g[0]", Some("b")).await?;

    s.delete("table_a", "g[0]")
        .await
        .map_err(|e| e.to_string())?;
    expect_value(&s, "table_a", "g[0]", None).await?;
    expect_value(&s, "table_b", "g[0]", Some("b")).await
}

async fn chunk_keys_are_independent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for i in 0..3 {
        s.put(TABLE, &format!("g[{i}]"), &format!("chunk-{i}"))
            .await
            .map_err(|e| e.to_string())?;
    }
    s.delete(TABLE, "g[1]").await.map_err(|e| e.to_string())?;
    expect_value(&s, TABLE, "g[0]", Some("chunk-0")).await?;
    expect_value(&s, TABLE, "g[1]", None).await?;
    expect_value(&s, TABLE, "g[2]", Some("chunk-2")).await
}

/// Chunk values are raw slices of JSON text; quotes, brackets, and
/// backslashes must come back byte-for-byte.
async fn json_text_stored_verbatim<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let raw = r#"["cn=a\\,b","ü","#;
    s.put(TABLE, "g[0]", raw).await.map_err(|e| e.to_string())?;
    expect_value(&s, TABLE, "g[0]", Some(raw)).await
}
