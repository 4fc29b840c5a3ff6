//! Line tokenizer shared by replay, id recovery and snapshot loading.
//!
//! Reads arrive in arbitrary-sized chunks; [`LineSplitter`] reassembles them
//! into newline-delimited lines. A final line without a trailing newline is
//! still yielded at end of input.

use crate::error::WalError;
use crate::record::LogRecord;
use crate::READ_CHUNK_SIZE;
use bytes::{Buf, Bytes, BytesMut};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Reassembles byte chunks into lines.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: BytesMut,
    /// Bytes of `buf` already searched for a newline.
    scanned: usize,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk of input.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Returns the next complete line, without its newline.
    pub fn next_line(&mut self) -> Option<Bytes> {
        let pos = self.buf[self.scanned..].iter().position(|&b| b == b'\n');
        match pos {
            Some(pos) => {
                let line = self.buf.split_to(self.scanned + pos).freeze();
                self.buf.advance(1);
                self.scanned = 0;
                Some(line)
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Drains whatever is left once input is exhausted.
    pub fn finish(&mut self) -> Option<Bytes> {
        self.scanned = 0;
        if self.buf.is_empty() {
            None
        } else {
            Some(self.buf.split().freeze())
        }
    }
}

/// Iterates over the lines of a reader.
pub struct LineReader<R> {
    inner: R,
    splitter: LineSplitter,
    chunk: Vec<u8>,
    eof: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_chunk_size(inner, READ_CHUNK_SIZE)
    }

    pub fn with_chunk_size(inner: R, chunk_size: usize) -> Self {
        Self {
            inner,
            splitter: LineSplitter::new(),
            chunk: vec![0u8; chunk_size.max(1)],
            eof: false,
        }
    }
}

impl<R: Read> Iterator for LineReader<R> {
    type Item = Result<Bytes, WalError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.splitter.next_line() {
                return Some(Ok(line));
            }
            if self.eof {
                return self.splitter.finish().map(Ok);
            }
            match self.inner.read(&mut self.chunk) {
                Ok(0) => self.eof = true,
                Ok(n) => self.splitter.push(&self.chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.eof = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

/// Iterates over the records of a WAL stream.
///
/// Yields `Err(WalError::Format { .. })` for lines that do not decode, with
/// the 1-based line number filled in, and keeps going. Any other error is an
/// I/O failure of the underlying reader.
pub struct RecordReader<R> {
    lines: LineReader<R>,
    line_no: u64,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self::from_lines(LineReader::new(inner))
    }

    pub fn from_lines(lines: LineReader<R>) -> Self {
        Self { lines, line_no: 0 }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<LogRecord, WalError>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => return Some(Err(e)),
        };
        self.line_no += 1;
        let line_no = self.line_no;

        let parsed = std::str::from_utf8(&line)
            .map_err(|_| WalError::Format {
                line: line_no,
                reason: "line is not valid UTF-8".to_string(),
            })
            .and_then(LogRecord::parse)
            .map_err(|e| match e {
                WalError::Format { reason, .. } => WalError::Format {
                    line: line_no,
                    reason,
                },
                other => other,
            });
        Some(parsed)
    }
}

/// Opens a WAL file for record iteration.
///
/// Returns `None` when the file does not exist.
pub fn open_records(path: impl AsRef<Path>) -> Result<Option<RecordReader<File>>, WalError> {
    match File::open(path.as_ref()) {
        Ok(file) => Ok(Some(RecordReader::new(file))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
