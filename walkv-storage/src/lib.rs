//! # walkv-storage
//!
//! Storage layer for walkv.
//!
//! This crate provides:
//! - The in-memory key-value store and its entry limits
//! - Full-rewrite snapshot persistence in `key=value` form
//! - Snapshot loading through the WAL line tokenizer

pub mod error;
pub mod snapshot;
pub mod store;

pub use error::StorageError;
pub use snapshot::{load_snapshot, SnapshotWriter};
pub use store::{KeyValueStore, StoreLimits};

/// Default snapshot file name.
pub const DEFAULT_SNAPSHOT_FILE: &str = "db.txt";

/// Default maximum number of entries held by the store.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default maximum value length in bytes.
pub const DEFAULT_MAX_VALUE_LEN: usize = 1023;
