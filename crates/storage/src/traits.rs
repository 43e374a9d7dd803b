use async_trait::async_trait;

use crate::error::StorageError;

/// A table-scoped key/value store holding snapshot chunk records.
///
/// ## Not-found semantics
///
/// A missing record is a normal value, not an error:
///
/// - `get` returns `Ok(None)` for a missing key. `Ok(Some(""))` is a stored
///   empty string and MUST NOT be conflated with a missing key.
/// - `delete` returns `Ok(false)` when there was nothing to delete.
///
/// Callers scanning `group[0]`, `group[1]`, ... rely on this distinction to
/// find the end of a chunk sequence.
///
/// ## Value width
///
/// Backends modelled on a fixed-width column report it via `max_value_len`
/// (in characters) and reject longer values from `put` with
/// `StorageError::ValueTooLong`.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` so one backend can be
/// shared by reconciliation runs for different groups.
#[async_trait]
pub trait KeyValueBackend: Send + Sync + 'static {
    /// Read the value stored at `key` in `table`.
    async fn get(&self, table: &str, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` at `key` in `table`, replacing any previous value.
    async fn put(&self, table: &str, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key` from `table`. Returns whether a record existed.
    async fn delete(&self, table: &str, key: &str) -> Result<bool, StorageError>;

    /// Maximum value length in characters, if the backend is bounded.
    fn max_value_len(&self) -> Option<usize> {
        None
    }
}

/// Shared width check for backends with a bounded value column.
pub(crate) fn check_width(
    max: Option<usize>,
    table: &str,
    key: &str,
    value: &str,
) -> Result<(), StorageError> {
    if let Some(max) = max {
        let len = value.chars().count();
        if len > max {
            return Err(StorageError::ValueTooLong {
                table: table.to_string(),
                key: key.to_string(),
                len,
                max,
            });
        }
    }
    Ok(())
}
