//! Append-only WAL writer.

use crate::error::WalError;
use crate::record::LogRecord;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// I/O statistics for a [`LogWriter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogStats {
    /// Records appended.
    pub records: u64,
    /// Total bytes written, including any torn-tail terminator.
    pub bytes_written: u64,
    /// fsync operations performed.
    pub syncs: u64,
}

/// Appends records to a single WAL file.
///
/// The file is opened lazily and created on the first append. Records are
/// only ever appended; the writer never seeks within or truncates the log.
pub struct LogWriter {
    path: PathBuf,
    file: Option<File>,
    sync_pending: bool,
    stats: LogStats,
}

impl LogWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            sync_pending: false,
            stats: LogStats::default(),
        }
    }

    /// Returns the WAL file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current I/O statistics.
    pub fn stats(&self) -> LogStats {
        self.stats
    }

    /// Appends a record as one line.
    ///
    /// With `durable` set the line is on stable storage when this returns.
    /// Without it the record may be lost on crash even though the call
    /// succeeded.
    pub fn append(&mut self, record: &LogRecord, durable: bool) -> Result<(), WalError> {
        let line = record.encode();
        let file = self.file()?;
        file.write_all(line.as_bytes())?;

        self.sync_pending = true;
        self.stats.records += 1;
        self.stats.bytes_written += line.len() as u64;
        tracing::debug!(record = %record, durable, "appended WAL record");

        if durable {
            self.sync()?;
        }
        Ok(())
    }

    /// Forces any appended data to stable storage.
    pub fn sync(&mut self) -> Result<(), WalError> {
        if self.sync_pending {
            if let Some(file) = self.file.as_mut() {
                file.sync_data()?;
                self.stats.syncs += 1;
            }
            self.sync_pending = false;
        }
        Ok(())
    }

    fn file(&mut self) -> Result<&mut File, WalError> {
        if self.file.is_none() {
            let torn = has_torn_tail(&self.path)?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;

            // A crash mid-append can leave a final line without its newline.
            // Terminate it so the next record starts on a fresh line.
            if torn {
                tracing::warn!(
                    path = %self.path.display(),
                    "WAL ends with a partial line; terminating it before appending"
                );
                file.write_all(b"\n")?;
                self.stats.bytes_written += 1;
                self.sync_pending = true;
            }
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| WalError::Io(io::Error::new(io::ErrorKind::Other, "WAL not open")))
    }
}

/// Returns true if the file exists, is non-empty and does not end in `\n`.
fn has_torn_tail(path: &Path) -> Result<bool, WalError> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
