//! WAL error types.

use thiserror::Error;

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line that does not decode to a record. Replay and id recovery
    /// skip these instead of failing.
    #[error("malformed record at line {line}: {reason}")]
    Format { line: u64, reason: String },

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("transaction ids exhausted after {0}")]
    IdsExhausted(u64),
}

impl WalError {
    /// Returns whether this error marks a single bad line rather than a
    /// failure of the log itself.
    pub fn is_format(&self) -> bool {
        matches!(self, WalError::Format { .. })
    }
}
