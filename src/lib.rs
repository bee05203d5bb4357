//! geonames_sql library: GeoNames ETL into SQLite plus proximity search
//!
//! This library downloads the GeoNames reference data, a primary geoname dataset and
//! the postal code dump, parses every file against a declarative column schema, and
//! bulk-loads the rows into SQLite in foreign-key order. Postal codes and geonames can
//! then be queried by radius.
//!
//! # Example
//!
//! ```no_run
//! use geonames_sql::{run_import, Config, Dataset};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     dataset: Dataset::Cities15000,
//!     use_cache: true,
//!     ..Default::default()
//! };
//!
//! let report = run_import(config).await?;
//! println!("Imported {} rows", report.rows_inserted());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

mod app;
pub mod config;
pub mod download;
mod error_handling;
pub mod import;
pub mod initialization;
pub mod parse;
pub mod proximity;
pub mod reader;
pub mod storage;
mod utils;

// Re-export public API
pub use config::{Config, Dataset, LogFormat, LogLevel};
pub use error_handling::{
    DownloadError, ImportCounter, ImportError, ImportStats, InitializationError,
};
pub use import::{ImportOptions, Importer, ImporterReport};
pub use proximity::{geonames_within_radius, postal_codes_around, postal_codes_within};
pub use run::{import_files, run_import, FailedImporter, ImportReport};
pub use storage::{SqliteStore, Store};

// Internal run module (contains the import pipeline)
mod run {
    use std::path::PathBuf;
    use std::time::Instant;

    use anyhow::{Context, Result};
    use chrono::Utc;
    use log::{error, info, warn};

    use crate::app::print_import_summary;
    use crate::config::Config;
    use crate::download::{build_client, download_plan, fetch_plan, Includes};
    use crate::error_handling::ImportError;
    use crate::import::{build_importers, ImportOptions, Importer, ImporterReport};
    use crate::storage::{SqliteStore, Store, Table};

    /// An importer that failed while `continue_on_error` was set.
    #[derive(Debug, Clone)]
    pub struct FailedImporter {
        /// Importer name
        pub importer: String,
        /// Target table
        pub table: Table,
        /// Rendered error
        pub error: String,
    }

    /// Results of an import run.
    #[derive(Debug)]
    pub struct ImportReport {
        /// One report per importer that ran to completion, in run order
        pub importers: Vec<ImporterReport>,
        /// Importers that failed or were skipped (only with `continue_on_error`)
        pub failed: Vec<FailedImporter>,
        /// Path to the SQLite database
        pub db_path: PathBuf,
        /// Schema the tables live in
        pub schema: String,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    impl ImportReport {
        pub fn is_complete(&self) -> bool {
            self.failed.is_empty()
        }

        /// Rows inserted across every importer.
        pub fn rows_inserted(&self) -> u64 {
            self.importers.iter().map(ImporterReport::rows_inserted).sum()
        }
    }

    /// Runs a full import with the provided configuration.
    ///
    /// Steps: connect (fail fast) → download and extract → build the ordered
    /// importers → create tables → purge unless `keep_existing_data` → run each
    /// importer → record the update time.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The database cannot be opened
    /// - A file cannot be downloaded or extracted
    /// - A downloaded file is not a known GeoNames file
    /// - An importer fails, unless `continue_on_error` is set; failures are then
    ///   listed in [`ImportReport::failed`] and the update time is not recorded
    pub async fn run_import(config: Config) -> Result<ImportReport> {
        let start = Instant::now();

        let store = SqliteStore::connect(&config.db_path, &config.schema)
            .await
            .context("Failed to open database")?;

        let plan = download_plan(
            config.dataset,
            &config.language_code,
            Includes::from(&config),
        )
        .context("Failed to build download plan")?;
        let client = build_client().context("Failed to initialize HTTP client")?;
        let files = fetch_plan(&client, &plan, &config.download_dir, config.use_cache)
            .await
            .context("Failed to download GeoNames files")?;
        info!("{} file(s) ready in {}", files.len(), config.download_dir.display());

        let importers = build_importers(&files).context("Failed to resolve downloaded files")?;

        store
            .create_tables(config.recreate_tables)
            .await
            .context("Failed to create tables")?;
        if config.keep_existing_data {
            info!("Keeping existing rows; duplicate keys will fail the import");
        } else {
            let removed = store.purge().await.context("Failed to purge tables")?;
            info!("Purged {removed} existing row(s)");
        }

        let options = ImportOptions::from(&config);
        let (reports, failed) = run_importers(&store, &importers, &options, config.continue_on_error)
            .await
            .context("Import failed")?;

        if failed.is_empty() {
            store
                .record_update(Utc::now())
                .await
                .context("Failed to record update time")?;
        }

        let elapsed_seconds = start.elapsed().as_secs_f64();
        print_import_summary(&reports, elapsed_seconds);

        if let Err(e) = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(store.pool())
            .await
        {
            warn!("Failed to checkpoint WAL file (this is non-critical): {}", e);
        }
        store.close().await;

        Ok(ImportReport {
            importers: reports,
            failed,
            db_path: config.db_path,
            schema: config.schema,
            elapsed_seconds,
        })
    }

    /// Imports local files into an existing store, aborting on the first
    /// failing importer.
    ///
    /// Tables must already exist; nothing is purged.
    pub async fn import_files<S: Store>(
        store: &S,
        paths: &[PathBuf],
        options: &ImportOptions,
    ) -> Result<Vec<ImporterReport>, ImportError> {
        let importers = build_importers(paths)?;
        let (reports, _) = run_importers(store, &importers, options, false).await?;
        Ok(reports)
    }

    /// Runs importers in order.
    ///
    /// With `continue_on_error` a failed importer is recorded and every later
    /// importer that depends on its table is skipped; otherwise the first error
    /// is returned.
    async fn run_importers<S: Store>(
        store: &S,
        importers: &[Importer],
        options: &ImportOptions,
        continue_on_error: bool,
    ) -> Result<(Vec<ImporterReport>, Vec<FailedImporter>), ImportError> {
        let mut reports = Vec::with_capacity(importers.len());
        let mut failed: Vec<FailedImporter> = Vec::new();

        for importer in importers {
            if let Some(broken) = failed
                .iter()
                .find(|f| importer.follows().contains(&f.table))
            {
                warn!(
                    "Skipping {}: depends on {} which failed",
                    importer.name(),
                    broken.table
                );
                failed.push(FailedImporter {
                    importer: importer.name(),
                    table: importer.table(),
                    error: format!("skipped, {} failed", broken.table),
                });
                continue;
            }

            match importer.run(store, options).await {
                Ok(report) => reports.push(report),
                Err(e) if continue_on_error => {
                    error!("{} failed: {}", importer.name(), e);
                    failed.push(FailedImporter {
                        importer: importer.name(),
                        table: importer.table(),
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    error!("{} failed: {}", importer.name(), e);
                    return Err(e);
                }
            }
        }
        Ok((reports, failed))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::storage::test_helpers::create_test_store;
        use std::fs;
        use std::path::Path;
        use tempfile::TempDir;

        const COUNTRY: &str = "AD\tAND\t020\tAN\tAndorra\tAndorra la Vella\t468\t77006\tEU\t.ad\tEUR\tEuro\t376\tAD###\t^(?:AD)*(\\d{3})$\tca\t3041565\tES,FR\t\n";
        const FEATURES: &str = "P.PPL\tpopulated place\t\n";
        const GEONAME: &str = "3041563\tAndorra la Vella\tAndorra la Vella\t\t42.50779\t1.52109\tP\tPPLC\tAD\t\t07\t\t\t\t20430\t\t1037\t\t2020-03-03\n";

        fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
            let path = dir.join(name);
            fs::write(&path, contents).unwrap();
            path
        }

        #[tokio::test]
        async fn test_continue_on_error_skips_dependents() {
            let dir = TempDir::new().unwrap();
            let paths = vec![
                write(dir.path(), "countryInfo.txt", "AD\tbroken\n"),
                write(dir.path(), "featureCodes_en.txt", FEATURES),
                write(dir.path(), "cities15000.txt", GEONAME),
            ];
            let importers = build_importers(&paths).unwrap();
            let store = create_test_store().await;

            let (reports, failed) =
                run_importers(&store, &importers, &ImportOptions::default(), true)
                    .await
                    .unwrap();
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].table, Table::Feature);
            let tables: Vec<Table> = failed.iter().map(|f| f.table).collect();
            assert_eq!(tables, vec![Table::Country, Table::Geoname]);
            assert!(failed[1].error.starts_with("skipped"));
        }

        #[tokio::test]
        async fn test_abort_all_by_default() {
            let dir = TempDir::new().unwrap();
            let paths = vec![
                write(dir.path(), "countryInfo.txt", "AD\tbroken\n"),
                write(dir.path(), "featureCodes_en.txt", FEATURES),
            ];
            let store = create_test_store().await;
            let result = import_files(&store, &paths, &ImportOptions::default()).await;
            assert!(matches!(result, Err(ImportError::Parse { line: 1, .. })));
            assert_eq!(store.count(Table::Feature).await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_import_files_in_dependency_order() {
            let dir = TempDir::new().unwrap();
            let paths = vec![
                write(dir.path(), "cities15000.txt", GEONAME),
                write(dir.path(), "countryInfo.txt", COUNTRY),
                write(dir.path(), "featureCodes_en.txt", "P.PPLC\tcapital\t\n"),
            ];
            let store = create_test_store().await;
            let reports = import_files(&store, &paths, &ImportOptions::default())
                .await
                .unwrap();
            let tables: Vec<Table> = reports.iter().map(|r| r.table).collect();
            assert_eq!(tables, vec![Table::Country, Table::Feature, Table::Geoname]);
            assert_eq!(store.count(Table::Geoname).await.unwrap(), 1);
        }
    }
}
