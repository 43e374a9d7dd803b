//! Conformance test suite for `KeyValueBackend` implementations.
//!
//! This module provides a backend-agnostic test suite that any
//! `KeyValueBackend` implementation can run to verify it honours the contract
//! the snapshot store depends on. The suite covers:
//!
//! - **Records**: put/get/delete, overwrite, table isolation
//! - **Not-found semantics**: missing keys vs. stored empty strings
//! - **Value width**: bounded backends reject over-long values intact
//! - **Concurrency**: parallel writers on distinct keys all land
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty backend for each test:
//!
//! ```ignore
//! use rolesync_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn memory_conformance() {
//!     let report = run_conformance_suite(|| async { MemoryBackend::new() }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod concurrent;
mod error;
mod records;

use std::fmt;
use std::future::Future;

use crate::KeyValueBackend;

/// Table name used by every conformance test.
const TABLE: &str = "conformance";

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "records", "error").
    pub category: String,
    /// Test name (e.g. "get_missing_key_is_none").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// backend, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: KeyValueBackend,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(records::run_record_tests(&factory).await);
    results.extend(error::run_error_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

async fn expect_value<S: KeyValueBackend>(
    s: &S,
    table: &str,
    key: &str,
    expected: Option<&str>,
) -> Result<(), String> {
    let got = s
        .get(table, key)
        .await
        .map_err(|e| format!("get {table}/{key}: {e}"))?;
    if got.as_deref() != expected {
        return Err(format!(
            "{table}/{key}: expected {expected:?}, got {:?}",
            got.as_deref()
        ));
    }
    Ok(())
}
