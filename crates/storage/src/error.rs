/// All errors that can be returned by a KeyValueBackend implementation.
///
/// "Record not found" is deliberately absent: `get` reports it as `Ok(None)`
/// and `delete` as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The value exceeds the backend's fixed value width.
    #[error("value for {table}/{key} is {len} characters, backend limit is {max}")]
    ValueTooLong {
        table: String,
        key: String,
        len: usize,
        max: usize,
    },

    /// The backend could not be reached (connection refused, timeout, etc.).
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing the backing file failed.
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file does not contain a valid table document.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A backend-specific storage error.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// True for connectivity failures that a later attempt may not hit.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_) | StorageError::Io(_))
    }
}
