//! Snapshot storage.
//!
//! A snapshot is the whole store written as `key=value` lines. Every persist
//! truncates and rewrites the file; there is no incremental form.

use crate::error::StorageError;
use crate::store::KeyValueStore;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use walkv_wal::LineReader;

/// Writes full snapshots of a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrites the snapshot file from `store`.
    ///
    /// With `durable` set the file is fsynced before returning. Returns the
    /// number of entries written.
    pub fn persist(&self, store: &KeyValueStore, durable: bool) -> Result<usize, StorageError> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        for (key, value) in store.iter() {
            writeln!(writer, "{}={}", key, value)?;
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        if durable {
            file.sync_all()?;
        }

        tracing::debug!(
            path = %self.path.display(),
            entries = store.len(),
            durable,
            "persisted snapshot"
        );
        Ok(store.len())
    }

    /// Loads the snapshot entries. See [`load_snapshot`].
    pub fn load(&self) -> Result<Option<Vec<(String, String)>>, StorageError> {
        load_snapshot(&self.path)
    }
}

/// Reads the entries of a snapshot file in file order.
///
/// Each line splits at its first `=`. Lines without one, or that are not
/// valid UTF-8, are skipped. Returns `None` when the file does not exist.
pub fn load_snapshot(
    path: impl AsRef<Path>,
) -> Result<Option<Vec<(String, String)>>, StorageError> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    for (idx, line) in LineReader::new(file).enumerate() {
        let line = line?;
        let parsed = std::str::from_utf8(&line)
            .ok()
            .and_then(|l| l.split_once('='));
        match parsed {
            Some((key, value)) => entries.push((key.to_string(), value.to_string())),
            None => tracing::debug!(line = idx + 1, "skipping snapshot line without '='"),
        }
    }

    tracing::debug!(path = %path.display(), entries = entries.len(), "loaded snapshot");
    Ok(Some(entries))
}
