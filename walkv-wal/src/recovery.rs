//! WAL replay.
//!
//! Replay walks the log from the start with a two-state machine:
//!
//! - `Begin(tid)` in any state opens `tid` with an empty payload, dropping
//!   whatever transaction was still open.
//! - `Set(k, v)` while open replaces the pending payload.
//! - `Commit(tid)` while open yields the pending write if the id matches and
//!   a key was set, then returns to idle either way.
//! - A `Commit` or `Set` while idle, and any malformed line, is ignored.
//! - A transaction still open at end of input is dropped.
//!
//! Malformed lines are treated as evidence of an interrupted write, never as
//! fatal corruption.

use crate::error::WalError;
use crate::reader::open_records;
use crate::record::{LogRecord, TxnId};
use std::path::Path;

/// Replay state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReplayState {
    #[default]
    Idle,
    Open {
        tid: TxnId,
        key: String,
        value: String,
    },
}

/// The effect of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedWrite {
    pub tid: TxnId,
    pub key: String,
    pub value: String,
}

/// Summary of a replay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Lines that decoded to a record.
    pub records: u64,
    /// Lines skipped as malformed or torn.
    pub malformed: u64,
    /// Transactions whose effect was yielded.
    pub committed: u64,
    /// Opened transactions that ended without an effect.
    pub discarded: u64,
    /// Commits seen with no transaction open.
    pub orphan_commits: u64,
    /// Sets seen with no transaction open.
    pub stray_sets: u64,
    /// Highest transaction id in any Begin or Commit.
    pub max_tid: Option<TxnId>,
}

/// Replay state machine.
#[derive(Debug, Default)]
pub struct Replayer {
    state: ReplayState,
    report: ReplayReport,
}

impl Replayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    pub fn state(&self) -> &ReplayState {
        &self.state
    }

    /// Feeds one record, returning the write to apply if it completed a
    /// transaction.
    pub fn feed(&mut self, record: LogRecord) -> Option<CommittedWrite> {
        self.report.records += 1;
        if let Some(tid) = record.tid() {
            self.report.max_tid = Some(self.report.max_tid.map_or(tid, |m| m.max(tid)));
        }

        match record {
            LogRecord::Begin { tid } => {
                let fresh = ReplayState::Open {
                    tid,
                    key: String::new(),
                    value: String::new(),
                };
                let previous = std::mem::replace(&mut self.state, fresh);
                if let ReplayState::Open { tid: prev, .. } = previous {
                    tracing::warn!(
                        tid = prev,
                        next = tid,
                        "transaction superseded by a new Begin; discarding"
                    );
                    self.report.discarded += 1;
                }
                None
            }
            LogRecord::Set { key, value } => {
                match &mut self.state {
                    ReplayState::Open {
                        key: pending_key,
                        value: pending_value,
                        ..
                    } => {
                        *pending_key = key;
                        *pending_value = value;
                    }
                    ReplayState::Idle => {
                        tracing::debug!(key = %key, "ignoring SET outside a transaction");
                        self.report.stray_sets += 1;
                    }
                }
                None
            }
            LogRecord::Commit { tid } => match std::mem::take(&mut self.state) {
                ReplayState::Idle => {
                    tracing::debug!(tid, "ignoring COMMIT with no open transaction");
                    self.report.orphan_commits += 1;
                    None
                }
                ReplayState::Open {
                    tid: open,
                    key,
                    value,
                } => {
                    if tid == open && !key.is_empty() {
                        self.report.committed += 1;
                        Some(CommittedWrite { tid, key, value })
                    } else {
                        tracing::warn!(
                            open,
                            commit = tid,
                            "commit does not complete open transaction"
                        );
                        self.report.discarded += 1;
                        None
                    }
                }
            },
        }
    }

    /// Records a line that could not be decoded.
    pub fn skip_malformed(&mut self, line: u64, reason: &str) {
        tracing::warn!(line, reason, "skipping malformed WAL line");
        self.report.malformed += 1;
    }

    /// Ends the replay, dropping any transaction still open.
    pub fn finish(mut self) -> ReplayReport {
        if let ReplayState::Open { tid, .. } = self.state {
            tracing::warn!(tid, "transaction has no commit record; discarding");
            self.report.discarded += 1;
        }
        self.report
    }
}

/// Replays a record stream, handing each committed write to `on_commit` in
/// log order.
///
/// Format errors are absorbed; I/O errors and errors from `on_commit` abort
/// the replay.
pub fn scan<I, E, F>(records: I, mut on_commit: F) -> Result<ReplayReport, E>
where
    I: IntoIterator<Item = Result<LogRecord, WalError>>,
    E: From<WalError>,
    F: FnMut(&CommittedWrite) -> Result<(), E>,
{
    let mut replayer = Replayer::new();
    for item in records {
        match item {
            Ok(record) => {
                if let Some(write) = replayer.feed(record) {
                    on_commit(&write)?;
                }
            }
            Err(WalError::Format { line, reason }) => replayer.skip_malformed(line, &reason),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(replayer.finish())
}

/// Replays the WAL without applying anything.
///
/// Returns `None` when the WAL does not exist.
pub fn verify_wal(path: impl AsRef<Path>) -> Result<Option<ReplayReport>, WalError> {
    match open_records(path)? {
        Some(records) => scan(records, |_| Ok::<(), WalError>(())).map(Some),
        None => Ok(None),
    }
}
