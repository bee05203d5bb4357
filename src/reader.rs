//! Streaming file reader.
//!
//! [`FileReader`] yields one parse result per data line and never holds more
//! than the current line in memory. Comment (`#`), blank and header lines are
//! counted and skipped; a malformed line is surfaced as
//! [`ImportError::Parse`] and reading can continue past it.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error_handling::ImportError;
use crate::parse::{parse_line, Record, Schema};

/// Lazy sequence of [`Record`]s read from one file.
///
/// The iterator is single-pass; use [`FileReader::reopen`] to read the file
/// again from the start.
pub struct FileReader {
    path: PathBuf,
    file_name: String,
    schema: &'static Schema,
    reader: BufReader<File>,
    buf: Vec<u8>,
    total_bytes: u64,
    consumed_bytes: u64,
    line_no: u64,
    lines_read: u64,
    lines_skipped: u64,
    finished: bool,
}

impl FileReader {
    pub fn open(path: impl AsRef<Path>, schema: &'static Schema) -> Result<Self, ImportError> {
        let path = path.as_ref().to_path_buf();
        let io_error = |source| ImportError::Io {
            path: path.clone(),
            source,
        };
        let file = File::open(&path).map_err(io_error)?;
        let total_bytes = file.metadata().map_err(io_error)?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(FileReader {
            file_name,
            schema,
            reader: BufReader::with_capacity(256 * 1024, file),
            buf: Vec::with_capacity(1024),
            total_bytes,
            consumed_bytes: 0,
            line_no: 0,
            lines_read: 0,
            lines_skipped: 0,
            finished: false,
            path,
        })
    }

    /// A fresh reader over the same file, positioned at the start.
    pub fn reopen(&self) -> Result<Self, ImportError> {
        FileReader::open(&self.path, self.schema)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used in error messages and logs.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Fraction of the file consumed so far, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total_bytes == 0 {
            return if self.finished { 1.0 } else { 0.0 };
        }
        (self.consumed_bytes as f64 / self.total_bytes as f64).min(1.0)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Data lines handed to the parser, malformed ones included.
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Header, comment and blank lines.
    pub fn lines_skipped(&self) -> u64 {
        self.lines_skipped
    }

    /// Number of the last line read (1-based).
    pub fn line_number(&self) -> u64 {
        self.line_no
    }

    fn parse_error(&self, raw: String, reason: String) -> ImportError {
        ImportError::Parse {
            file: self.file_name.clone(),
            line: self.line_no,
            raw,
            reason,
        }
    }
}

impl Iterator for FileReader {
    type Item = Result<Record, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(n) => self.consumed_bytes += n as u64,
                Err(source) => {
                    self.finished = true;
                    return Some(Err(ImportError::Io {
                        path: self.path.clone(),
                        source,
                    }));
                }
            }
            self.line_no += 1;

            if self.buf.last() == Some(&b'\n') {
                self.buf.pop();
                if self.buf.last() == Some(&b'\r') {
                    self.buf.pop();
                }
            }

            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line,
                Err(e) => {
                    self.lines_read += 1;
                    let raw = String::from_utf8_lossy(&self.buf).into_owned();
                    return Some(Err(self.parse_error(raw, format!("invalid UTF-8: {e}"))));
                }
            };
            let line = if self.line_no == 1 {
                line.strip_prefix('\u{feff}').unwrap_or(line)
            } else {
                line
            };

            if self.line_no == 1 && self.schema.header {
                debug!("{}: skipping header line", self.file_name);
                self.lines_skipped += 1;
                continue;
            }
            if line.is_empty() || line.starts_with('#') {
                self.lines_skipped += 1;
                continue;
            }

            self.lines_read += 1;
            let result = parse_line(self.schema, line, self.line_no);
            return Some(match result {
                Ok(record) => Ok(record),
                Err(e) => {
                    let raw = line.to_string();
                    Err(self.parse_error(raw, e.to_string()))
                }
            });
        }
    }
}
