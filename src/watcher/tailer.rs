//! Incremental log file tailer.
//!
//! Reads bytes appended to an installer log since the last read and turns
//! them into complete decoded lines.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::encoding::LogEncoding;
use super::error::WatcherError;

/// Default upper bound on bytes read from the file in one call.
pub const DEFAULT_MAX_READ_BYTES: usize = 1024 * 1024;

/// The log file a monitor watches and how it is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    path: PathBuf,
    encoding: LogEncoding,
}

impl WatchTarget {
    /// Watch `path` as UTF-8.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encoding: LogEncoding::Utf8,
        }
    }

    /// Use a different encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: LogEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Get the path being watched.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn encoding(&self) -> LogEncoding {
        self.encoding
    }
}

/// Read position within a watched file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadCursor {
    /// Bytes consumed into complete lines.
    offset: u64,
    /// Bytes read past `offset` that do not end in a line boundary yet.
    carry: Vec<u8>,
}

impl ReadCursor {
    /// Get the byte offset of the first byte not yet delivered as a line.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Get the pending partial line bytes.
    #[must_use]
    pub fn carry(&self) -> &[u8] {
        &self.carry
    }

    /// Position the next read starts from.
    #[must_use]
    pub fn read_position(&self) -> u64 {
        self.offset + self.carry.len() as u64
    }
}

/// Result of one read attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailRead {
    /// The file does not exist yet.
    Absent,
    /// Complete lines appended since the previous read, in file order.
    Lines(Vec<String>),
}

/// Incremental log reader that tracks its read position.
///
/// Only complete lines are returned. A trailing fragment without a line
/// terminator is held back until the rest of it is written.
#[derive(Debug)]
pub struct LogTailer {
    target: WatchTarget,
    cursor: ReadCursor,
    max_read_bytes: usize,
}

impl LogTailer {
    /// Create a new tailer for the given target.
    ///
    /// Starts at offset 0 (beginning of file).
    #[must_use]
    pub fn new(target: WatchTarget) -> Self {
        Self {
            target,
            cursor: ReadCursor::default(),
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
        }
    }

    /// Limit how many bytes a single read may consume.
    #[must_use]
    pub fn with_max_read_bytes(mut self, max_read_bytes: usize) -> Self {
        self.max_read_bytes = max_read_bytes.max(1);
        self
    }

    #[must_use]
    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    #[must_use]
    pub fn cursor(&self) -> &ReadCursor {
        &self.cursor
    }

    /// Read lines appended since the last read.
    ///
    /// A missing file is reported as [`TailRead::Absent`], not as an error.
    /// If the file shrank below the read position (the installer rewrote
    /// it), reading restarts from the beginning.
    ///
    /// # Errors
    ///
    /// Returns an error if the path exists but cannot be opened (locked,
    /// permission denied), is not a regular file, or an I/O error occurs
    /// while reading.
    pub async fn read_new_lines(&mut self) -> Result<TailRead, WatcherError> {
        let path = self.target.path();
        let mut file = match File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(TailRead::Absent),
            Err(e) => return Err(WatcherError::from_open(path, e)),
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(WatcherError::NotAFile(path.to_path_buf()));
        }
        let file_len = metadata.len();

        if file_len < self.cursor.read_position() {
            tracing::warn!(
                path = %path.display(),
                old_offset = self.cursor.read_position(),
                new_len = file_len,
                "Log truncated, resetting offset to 0"
            );
            self.cursor = ReadCursor::default();
        }

        let position = self.cursor.read_position();
        if file_len == position {
            return Ok(TailRead::Lines(Vec::new()));
        }

        file.seek(std::io::SeekFrom::Start(position)).await?;
        let mut chunk = Vec::new();
        file.take(self.max_read_bytes as u64)
            .read_to_end(&mut chunk)
            .await?;

        Ok(TailRead::Lines(self.consume(&chunk)))
    }

    /// Append `chunk` to the carry and split off every complete line.
    fn consume(&mut self, chunk: &[u8]) -> Vec<String> {
        let encoding = self.target.encoding();
        let at_start = self.cursor.offset == 0;

        let mut buf = std::mem::take(&mut self.cursor.carry);
        buf.extend_from_slice(chunk);
        let complete = encoding.complete_prefix_len(&buf);
        self.cursor.carry = buf.split_off(complete);
        self.cursor.offset += complete as u64;

        let mut body = buf.as_slice();
        if at_start {
            body = body.strip_prefix(encoding.bom()).unwrap_or(body);
        }

        let decoded = encoding.decode_lines(body);
        if decoded.anomalies > 0 {
            tracing::debug!(
                path = %self.target.path().display(),
                encoding = %encoding,
                anomalies = decoded.anomalies,
                "Skipped malformed bytes in log"
            );
        }
        decoded.lines
    }
}
