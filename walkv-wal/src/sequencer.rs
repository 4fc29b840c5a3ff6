//! Transaction id assignment.
//!
//! The sequencer keeps no state of its own on disk. After a restart the next
//! id is rebuilt by rescanning the WAL: one past the highest id carried by
//! any Begin or Commit record, or 1 for an absent or empty log.

use crate::error::WalError;
use crate::reader::open_records;
use crate::record::{LogRecord, TxnId, MAX_TXN_ID};
use std::path::Path;

/// Hands out strictly increasing transaction ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSequencer {
    next: TxnId,
}

impl Default for TransactionSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionSequencer {
    /// Creates a sequencer for an empty log.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Rebuilds the sequencer by scanning the WAL at `path`.
    pub fn recover(path: impl AsRef<Path>) -> Result<Self, WalError> {
        let path = path.as_ref();
        let sequencer = match open_records(path)? {
            Some(records) => Self::from_records(records)?,
            None => Self::new(),
        };
        tracing::debug!(
            path = %path.display(),
            next_tid = sequencer.next,
            "recovered transaction sequencer"
        );
        Ok(sequencer)
    }

    /// Rebuilds the sequencer from a record stream.
    ///
    /// Malformed lines are skipped; I/O errors abort the scan.
    pub fn from_records<I>(records: I) -> Result<Self, WalError>
    where
        I: IntoIterator<Item = Result<LogRecord, WalError>>,
    {
        let mut max_tid: TxnId = 0;
        for item in records {
            match item {
                Ok(record) => {
                    if let Some(tid) = record.tid() {
                        max_tid = max_tid.max(tid);
                    }
                }
                Err(WalError::Format { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        let next = max_tid
            .checked_add(1)
            .ok_or(WalError::IdsExhausted(max_tid))?;
        Ok(Self { next })
    }

    /// Returns the current id and advances the counter.
    ///
    /// Fails once every id up to [`MAX_TXN_ID`] has been handed out.
    pub fn next_id(&mut self) -> Result<TxnId, WalError> {
        if self.next > MAX_TXN_ID {
            return Err(WalError::IdsExhausted(MAX_TXN_ID));
        }
        let tid = self.next;
        self.next += 1;
        Ok(tid)
    }

    /// Returns the id the next call to [`next_id`](Self::next_id) will hand out.
    pub fn peek(&self) -> TxnId {
        self.next
    }
}
