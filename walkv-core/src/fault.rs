//! Fault injection.
//!
//! The injector writes a transaction to the WAL with an fsync after every
//! record and then stops, leaving the store and snapshot untouched. It only
//! borrows the log writer and the sequencer, so it cannot reach the store.

use crate::error::CoreError;
use std::fmt;
use std::str::FromStr;
use walkv_wal::{check_entry, LogRecord, LogWriter, TransactionSequencer, TxnId};

/// Where a simulated crash stops the write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrashPoint {
    /// After the Begin record.
    AfterBegin,
    /// After the Set record, before the Commit record.
    BeforeCommit,
    /// After the Commit record, before the store is touched.
    #[default]
    AfterCommit,
}

impl CrashPoint {
    /// Number of transaction records durable at this point.
    pub fn records_written(self) -> usize {
        match self {
            CrashPoint::AfterBegin => 1,
            CrashPoint::BeforeCommit => 2,
            CrashPoint::AfterCommit => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CrashPoint::AfterBegin => "after-begin",
            CrashPoint::BeforeCommit => "before-commit",
            CrashPoint::AfterCommit => "after-commit",
        }
    }
}

impl fmt::Display for CrashPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrashPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "after-begin" => Ok(CrashPoint::AfterBegin),
            "before-commit" => Ok(CrashPoint::BeforeCommit),
            "after-commit" => Ok(CrashPoint::AfterCommit),
            other => Err(format!(
                "unknown crash point '{}' (expected after-begin, before-commit or after-commit)",
                other
            )),
        }
    }
}

/// Outcome of a simulated crash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashReport {
    pub tid: TxnId,
    pub point: CrashPoint,
    pub records_written: usize,
}

impl CrashReport {
    /// Returns whether the Commit record reached the log, i.e. whether
    /// recovery will apply this transaction.
    pub fn committed(&self) -> bool {
        self.point == CrashPoint::AfterCommit
    }
}

/// Durably logs a transaction and halts before it is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultInjector {
    point: CrashPoint,
}

impl FaultInjector {
    pub fn new(point: CrashPoint) -> Self {
        Self { point }
    }

    /// Writes Begin/Set/Commit up to the crash point, each fsynced, then
    /// returns without applying or persisting anything.
    pub fn simulate_crash(
        &self,
        log: &mut LogWriter,
        sequencer: &mut TransactionSequencer,
        key: &str,
        value: &str,
    ) -> Result<CrashReport, CoreError> {
        check_entry(key, value)?;

        let tid = sequencer.next_id()?;
        let records = LogRecord::transaction(tid, key, value);
        let written = self.point.records_written();
        for record in &records[..written] {
            log.append(record, true)?;
        }

        tracing::warn!(tid, point = %self.point, "simulated crash: halting before apply");
        Ok(CrashReport {
            tid,
            point: self.point,
            records_written: written,
        })
    }
}
