//! Per-file-type importers.
//!
//! An [`Importer`] binds one [`FileFormat`] to the local files of that format
//! and loads them into the format's table: read a batch, resolve references,
//! insert, repeat. Batches are committed as they go, so a failing importer
//! leaves the rows of earlier batches in place.

mod registry;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::app::log_progress;
use crate::config::{Config, DEFAULT_BATCH_SIZE, PROGRESS_LOG_INTERVAL, SQLITE_MAX_BIND_PARAMS};
use crate::error_handling::{ImportCounter, ImportError, ImportStats};
use crate::parse::{FileFormat, OnMissing, Record, Value};
use crate::reader::FileReader;
use crate::storage::{Store, Table};

pub use registry::{build_importers, detect_format, order_importers};

/// Tunables shared by every importer of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Rows per INSERT, before the bind-parameter ceiling is applied.
    pub batch_size: usize,
    /// Drop rows whose rejected references are unknown instead of failing.
    pub skip_unknown_references: bool,
    /// Malformed lines tolerated per importer before it aborts.
    pub parse_error_limit: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            skip_unknown_references: false,
            parse_error_limit: 0,
        }
    }
}

impl From<&Config> for ImportOptions {
    fn from(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size,
            skip_unknown_references: config.skip_unknown_references,
            parse_error_limit: config.parse_error_limit,
        }
    }
}

/// Rows per INSERT: the configured size, capped so one statement never binds
/// more than SQLite allows.
pub fn effective_batch_size(batch_size: usize, column_count: usize) -> usize {
    let ceiling = SQLITE_MAX_BIND_PARAMS / column_count.max(1);
    batch_size.min(ceiling).max(1)
}

/// Outcome of one importer run.
#[derive(Debug)]
pub struct ImporterReport {
    pub importer: String,
    pub table: Table,
    pub files: Vec<PathBuf>,
    pub stats: ImportStats,
    pub elapsed: Duration,
}

impl ImporterReport {
    pub fn rows_inserted(&self) -> u64 {
        self.stats.get(ImportCounter::RowsInserted)
    }
}

/// Loads every file of one format into its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Importer {
    format: FileFormat,
    paths: Vec<PathBuf>,
}

impl Importer {
    pub fn new(format: FileFormat, paths: Vec<PathBuf>) -> Self {
        Self { format, paths }
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn name(&self) -> String {
        self.format.to_string()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Table this importer writes.
    pub fn table(&self) -> Table {
        self.format.table()
    }

    /// Tables that must hold rows before this importer may run.
    pub fn requires(&self) -> &'static [Table] {
        self.table().required_tables()
    }

    /// Tables whose importers, when present in the same run, go first.
    pub fn follows(&self) -> &'static [Table] {
        self.table().preceding_tables()
    }

    /// Imports every bound file, in order.
    ///
    /// # Errors
    ///
    /// - `DependencyOrder` if a required table is still empty
    /// - `Parse` for the first malformed line beyond the tolerated limit
    /// - `UnknownReference` / `Integrity` for rows the store cannot accept
    pub async fn run<S: Store>(
        &self,
        store: &S,
        options: &ImportOptions,
    ) -> Result<ImporterReport, ImportError> {
        let start = Instant::now();
        self.check_dependencies(store).await?;

        let stats = ImportStats::new();
        for path in &self.paths {
            self.import_file(store, path, options, &stats).await?;
        }

        let report = ImporterReport {
            importer: self.name(),
            table: self.table(),
            files: self.paths.clone(),
            stats,
            elapsed: start.elapsed(),
        };
        info!(
            "Finished {}: {} rows in {:.2}s",
            report.importer,
            report.rows_inserted(),
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }

    async fn check_dependencies<S: Store>(&self, store: &S) -> Result<(), ImportError> {
        for table in self.requires() {
            if store.count(*table).await? == 0 {
                return Err(ImportError::DependencyOrder {
                    importer: self.name(),
                    missing: table.name(),
                });
            }
        }
        Ok(())
    }

    async fn import_file<S: Store>(
        &self,
        store: &S,
        path: &Path,
        options: &ImportOptions,
        stats: &ImportStats,
    ) -> Result<(), ImportError> {
        let schema = self.format.schema();
        let mut reader = FileReader::open(path, schema)?;
        let file_name = reader.file_name().to_string();
        let batch_size = effective_batch_size(options.batch_size, schema.columns.len());
        info!(
            "Importing {} into {} (batches of {})",
            file_name, schema.table, batch_size
        );

        let start = Instant::now();
        let mut last_log = Instant::now();
        let mut batch: Vec<Record> = Vec::with_capacity(batch_size);

        let outcome = loop {
            let Some(result) = reader.next() else {
                break Ok(());
            };
            match result {
                Ok(record) => batch.push(record),
                // The limit spans every file of the importer.
                Err(e)
                    if e.is_parse()
                        && stats.get(ImportCounter::ParseErrors)
                            < options.parse_error_limit as u64 =>
                {
                    stats.increment(ImportCounter::ParseErrors);
                    warn!("Skipping malformed line: {e}");
                    continue;
                }
                Err(e) => break Err(e),
            }

            if batch.len() >= batch_size {
                if let Err(e) = flush(store, &mut batch, &file_name, options, stats).await {
                    break Err(e);
                }
            }

            if last_log.elapsed() >= PROGRESS_LOG_INTERVAL {
                log_progress(&file_name, reader.progress(), reader.lines_read(), start);
                last_log = Instant::now();
            }
        };

        stats.add(ImportCounter::LinesRead, reader.lines_read());
        stats.add(ImportCounter::LinesSkipped, reader.lines_skipped());
        outcome?;

        flush(store, &mut batch, &file_name, options, stats).await?;
        debug!(
            "{}: {} lines read, {} skipped",
            file_name,
            reader.lines_read(),
            reader.lines_skipped()
        );
        Ok(())
    }
}

/// Resolves references, inserts the batch and empties it.
async fn flush<S: Store>(
    store: &S,
    batch: &mut Vec<Record>,
    file_name: &str,
    options: &ImportOptions,
    stats: &ImportStats,
) -> Result<(), ImportError> {
    if batch.is_empty() {
        return Ok(());
    }
    resolve_references(store, batch, file_name, options, stats).await?;
    if !batch.is_empty() {
        let inserted = store.insert_batch(batch).await?;
        stats.add(ImportCounter::RowsInserted, inserted);
        stats.increment(ImportCounter::Batches);
    }
    batch.clear();
    Ok(())
}

/// Applies each reference column's policy with one lookup per column.
async fn resolve_references<S: Store>(
    store: &S,
    batch: &mut Vec<Record>,
    file_name: &str,
    options: &ImportOptions,
    stats: &ImportStats,
) -> Result<(), ImportError> {
    let Some(schema) = batch.first().map(Record::schema) else {
        return Ok(());
    };

    for (index, column) in schema.references() {
        let Some(reference) = column.reference else {
            continue;
        };
        let values: Vec<Value> = batch
            .iter()
            .map(|record| record.values()[index].clone())
            .filter(|value| !value.is_null())
            .collect();
        if values.is_empty() {
            continue;
        }
        let known = store
            .existing_keys(reference.table, reference.column, &values)
            .await?;
        let is_unknown = |record: &Record, known: &HashSet<String>| {
            record.values()[index]
                .as_key()
                .is_some_and(|key| !known.contains(&key))
        };

        match reference.on_missing {
            OnMissing::Null => {
                for record in batch.iter_mut() {
                    if is_unknown(record, &known) {
                        debug!(
                            "{}:{}: unknown {} {:?}, stored as NULL",
                            file_name,
                            record.line(),
                            column.name,
                            record.values()[index].to_field()
                        );
                        record.set(index, Value::Null);
                        stats.increment(ImportCounter::NulledReferences);
                    }
                }
            }
            OnMissing::Reject if options.skip_unknown_references => {
                let before = batch.len();
                batch.retain(|record| !is_unknown(record, &known));
                let dropped = (before - batch.len()) as u64;
                if dropped > 0 {
                    warn!(
                        "{}: skipped {} rows with unknown {}",
                        file_name, dropped, column.name
                    );
                    stats.add(ImportCounter::UnknownReferenceRows, dropped);
                }
            }
            OnMissing::Reject => {
                if let Some(record) = batch.iter().find(|record| is_unknown(record, &known)) {
                    return Err(ImportError::UnknownReference {
                        file: file_name.to_string(),
                        line: record.line(),
                        table: reference.table.name(),
                        column: column.name,
                        value: record.values()[index].to_field(),
                    });
                }
            }
        }
    }
    Ok(())
}
