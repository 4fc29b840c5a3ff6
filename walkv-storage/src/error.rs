//! Storage error types.

use thiserror::Error;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("too many keys: store is limited to {max} entries")]
    Capacity { max: usize },

    #[error("value for key '{key}' is {len} bytes (max {max})")]
    ValueTooLarge { key: String, len: usize, max: usize },

    #[error("WAL error: {0}")]
    Wal(#[from] walkv_wal::WalError),
}

impl StorageError {
    /// Returns whether this error is a store limit rather than an I/O failure.
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            StorageError::Capacity { .. } | StorageError::ValueTooLarge { .. }
        )
    }
}
