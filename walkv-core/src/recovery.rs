//! Recovery replay into a store.

use crate::error::CoreError;
use std::path::Path;
use walkv_storage::KeyValueStore;
use walkv_wal::{open_records, scan, LogRecord, ReplayReport, WalError};

/// Applies the committed transactions of a WAL to a store.
pub struct RecoveryReplayer<'a> {
    store: &'a mut KeyValueStore,
}

impl<'a> RecoveryReplayer<'a> {
    pub fn new(store: &'a mut KeyValueStore) -> Self {
        Self { store }
    }

    /// Replays a record stream from its start.
    ///
    /// Committed writes are applied in log order. Malformed lines and
    /// incomplete transactions are skipped. A store limit violation or an
    /// I/O error aborts the replay with the store holding every write applied
    /// before it.
    pub fn replay<I>(&mut self, records: I) -> Result<ReplayReport, CoreError>
    where
        I: IntoIterator<Item = Result<LogRecord, WalError>>,
    {
        let store = &mut *self.store;
        let report = scan(records, |write| {
            tracing::debug!(tid = write.tid, key = %write.key, "replaying committed write");
            store
                .apply_set(&write.key, &write.value)
                .map_err(CoreError::from)
        })?;

        tracing::info!(
            records = report.records,
            applied = report.committed,
            discarded = report.discarded,
            malformed = report.malformed,
            "WAL replay complete"
        );
        Ok(report)
    }

    /// Replays the WAL file at `path`.
    ///
    /// Returns `None`, leaving the store untouched, when the file does not
    /// exist.
    pub fn replay_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<Option<ReplayReport>, CoreError> {
        match open_records(path)? {
            Some(records) => self.replay(records).map(Some),
            None => Ok(None),
        }
    }
}
