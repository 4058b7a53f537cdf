use async_trait::async_trait;
use thiserror::Error;

/// Common result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
}

impl StorageError {
    pub fn from_source(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }
}

/// Scalar state persisted between monitor runs, addressed by section + key
/// (e.g. `balance_check` / `last`).
#[async_trait]
pub trait MonitorStateStore: Send + Sync {
    async fn get_value(&self, section: &str, key: &str) -> StorageResult<Option<i64>>;
    async fn set_value(&self, value: i64, section: &str, key: &str) -> StorageResult<()>;
}
