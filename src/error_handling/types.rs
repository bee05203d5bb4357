//! Error type definitions.
//!
//! This module defines the error types used throughout the application.

use std::path::PathBuf;

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Errors raised while importing GeoNames files into the store.
///
/// Parse and integrity errors abort the importer that raised them and carry
/// enough context (file, line, offending value) to fix the input and re-run
/// after a purge.
#[derive(Error, Debug)]
pub enum ImportError {
    /// A line failed column-count validation or type coercion.
    #[error("{file}:{line}: {reason} (line: {raw:?})")]
    Parse {
        file: String,
        line: u64,
        raw: String,
        reason: String,
    },

    /// A supplied path does not match any known GeoNames file.
    #[error("Unrecognized GeoNames file: {}", .0.display())]
    UnrecognizedFile(PathBuf),

    /// An importer was run before the tables it depends on were populated.
    #[error("{importer} requires table `{missing}` to be populated first")]
    DependencyOrder {
        importer: String,
        missing: &'static str,
    },

    /// Duplicate primary key or foreign-key violation reported by the store.
    #[error("Integrity error in table `{table}`: {detail}")]
    Integrity { table: &'static str, detail: String },

    /// A row references an id or code that is not present in the referenced table.
    #[error("{file}:{line}: {column} = {value} does not match any row in `{table}`")]
    UnknownReference {
        file: String,
        line: u64,
        table: &'static str,
        column: &'static str,
        value: String,
    },

    /// The store could not be reached when the run started.
    #[error("Cannot connect to database: {0}")]
    Connection(String),

    /// Schema names are interpolated into SQL and must be plain identifiers.
    #[error("Invalid schema name: {0:?}")]
    InvalidSchema(String),

    /// Proximity searches need a finite, non-negative radius.
    #[error("Invalid search radius: {0} km")]
    InvalidRadius(f64),

    /// Any other SQL error.
    #[error("SQL error: {0}")]
    Database(#[from] sqlx::Error),

    /// Reading an input file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImportError {
    /// True for duplicate keys, constraint violations and unknown references.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            ImportError::Integrity { .. } | ImportError::UnknownReference { .. }
        )
    }

    /// True for per-line parse failures.
    pub fn is_parse(&self) -> bool {
        matches!(self, ImportError::Parse { .. })
    }
}

/// Errors raised while fetching or unpacking GeoNames files.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Transport-level HTTP failure.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The downloaded archive could not be read.
    #[error("Archive error in {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// The archive does not contain the expected entry.
    #[error("{entry} not found in {}", path.display())]
    MissingEntry { path: PathBuf, entry: String },

    /// Writing the download or an extracted file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No feature code file is published for this language.
    #[error("Unsupported feature language {0:?}")]
    UnsupportedLanguage(String),

    /// A catalog URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The URL path does not end in a file name to save under.
    #[error("No file name in {0}")]
    NoFileName(String),

    /// The blocking extraction task panicked or was cancelled.
    #[error("Extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Counters tracked per importer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ImportCounter {
    /// Rows written to the target table
    RowsInserted,
    /// Data lines read from the input files
    LinesRead,
    /// Comment, header and blank lines
    LinesSkipped,
    /// Malformed lines tolerated under the parse-error limit
    ParseErrors,
    /// Reference columns stored as NULL because the code is unknown
    NulledReferences,
    /// Rows dropped because they reference unknown rows
    UnknownReferenceRows,
    /// INSERT statements executed
    Batches,
}

impl std::fmt::Display for ImportCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ImportCounter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportCounter::RowsInserted => "Rows inserted",
            ImportCounter::LinesRead => "Lines read",
            ImportCounter::LinesSkipped => "Lines skipped",
            ImportCounter::ParseErrors => "Malformed lines tolerated",
            ImportCounter::NulledReferences => "Unresolved references stored as NULL",
            ImportCounter::UnknownReferenceRows => "Rows skipped for unknown references",
            ImportCounter::Batches => "Batches",
        }
    }
}
