//! Core error types.

use crate::config::ConfigError;
use thiserror::Error;
use walkv_storage::StorageError;
use walkv_wal::WalError;

/// Errors from the durability engine.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CoreError {
    /// Returns an error code naming the failure class.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::Wal(WalError::InvalidRecord(_)) => "INVALID_ENTRY",
            CoreError::Wal(WalError::Format { .. }) => "FORMAT_ERROR",
            CoreError::Wal(WalError::Io(_)) => "RESOURCE_ERROR",
            CoreError::Wal(WalError::IdsExhausted(_)) => "RESOURCE_ERROR",
            CoreError::Storage(e) if e.is_capacity() => "CAPACITY_ERROR",
            CoreError::Storage(StorageError::Wal(WalError::Format { .. })) => "FORMAT_ERROR",
            CoreError::Storage(_) => "RESOURCE_ERROR",
            CoreError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Returns whether this error ends the current command.
    ///
    /// Everything that reaches a caller is fatal; malformed log lines are
    /// absorbed before they become a `CoreError`.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CoreError::Wal(WalError::Format { .. }))
    }
}
