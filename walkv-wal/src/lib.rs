//! # walkv-wal
//!
//! Write-Ahead Log implementation for walkv.
//!
//! This crate provides a durable, append-only text log with:
//! - One newline-terminated line per record
//! - Optional forced fsync per append
//! - Transaction id recovery by rescanning the log
//! - Lenient replay that tolerates torn or malformed lines

pub mod error;
pub mod reader;
pub mod record;
pub mod recovery;
pub mod sequencer;
pub mod writer;

pub use error::WalError;
pub use reader::{open_records, LineReader, LineSplitter, RecordReader};
pub use record::{check_entry, LogRecord, TxnId, MAX_TXN_ID};
pub use recovery::{scan, verify_wal, CommittedWrite, ReplayReport, ReplayState, Replayer};
pub use sequencer::TransactionSequencer;
pub use writer::{LogStats, LogWriter};

/// Default WAL file name.
pub const DEFAULT_WAL_FILE: &str = "wal.log";

/// Read chunk size used when scanning the log.
pub const READ_CHUNK_SIZE: usize = 8192;
