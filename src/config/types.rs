//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use strum_macros::{EnumIter, IntoStaticStr};

use crate::config::constants::{
    DB_PATH, DEFAULT_BATCH_SIZE, DEFAULT_LANGUAGE_CODE, DEFAULT_SCHEMA, DOWNLOAD_DIR_NAME,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Primary GeoNames dataset variant.
///
/// Exactly one primary dataset is imported per run; they all share the geoname
/// main-file layout and differ only in the population threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, EnumIter, IntoStaticStr)]
pub enum Dataset {
    /// Every geoname of every country (very large, over 12 million rows)
    #[value(name = "allCountries")]
    #[strum(serialize = "allCountries")]
    AllCountries,
    /// Cities with a population of 500 or more
    #[value(name = "cities500")]
    #[strum(serialize = "cities500")]
    Cities500,
    /// Cities with a population of 1000 or more
    #[value(name = "cities1000")]
    #[strum(serialize = "cities1000")]
    Cities1000,
    /// Cities with a population of 5000 or more
    #[value(name = "cities5000")]
    #[strum(serialize = "cities5000")]
    Cities5000,
    /// Cities with a population of 15000 or more
    #[value(name = "cities15000")]
    #[strum(serialize = "cities15000")]
    Cities15000,
}

impl Dataset {
    /// Base name shared by the archive and the text file inside it.
    pub fn stem(self) -> &'static str {
        self.into()
    }

    /// Name of the extracted data file, e.g. `cities1000.txt`.
    pub fn file_name(self) -> String {
        format!("{}.txt", self.stem())
    }

    /// Name of the published archive, e.g. `cities1000.zip`.
    pub fn archive_name(self) -> String {
        format!("{}.zip", self.stem())
    }
}

/// Library configuration (no CLI dependencies).
///
/// This is the configuration value handed to [`crate::run_import`]. It can be
/// constructed programmatically without any CLI dependencies.
///
/// # Examples
///
/// ```no_run
/// use geonames_sql::{Config, Dataset};
/// use std::path::PathBuf;
///
/// let config = Config {
///     dataset: Dataset::Cities15000,
///     db_path: PathBuf::from("./geonames.db"),
///     use_cache: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Primary dataset to import
    pub dataset: Dataset,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Database path (SQLite file)
    pub db_path: PathBuf,

    /// Schema the tables live in. `main` is the database file itself; any other
    /// name is attached as a sibling file `<schema>.db`.
    pub schema: String,

    /// Directory downloaded and extracted files are written to
    pub download_dir: PathBuf,

    /// Reuse previously downloaded files when present
    pub use_cache: bool,

    /// Feature code language (`featureCodes_<lang>.txt`)
    pub language_code: String,

    /// Rows per multi-row INSERT
    pub batch_size: usize,

    /// Do not purge existing rows before importing
    pub keep_existing_data: bool,

    /// Drop and recreate every table before importing
    pub recreate_tables: bool,

    /// Drop hierarchy/alternate-name rows that reference unknown geonames instead of failing
    pub skip_unknown_references: bool,

    /// Number of malformed lines tolerated per importer before it aborts
    pub parse_error_limit: usize,

    /// Keep running independent importers after one fails
    pub continue_on_error: bool,

    /// Import `hierarchy.txt`
    pub include_hierarchy: bool,

    /// Import `alternateNamesV2.txt`
    pub include_alternate_names: bool,

    /// Import postal codes
    pub include_postal_codes: bool,
}

/// Resolves the default download directory (`$HOME/.geonames-sql`, or the
/// working directory when `HOME` is unset).
pub fn default_download_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DOWNLOAD_DIR_NAME)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: Dataset::Cities1000,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            db_path: PathBuf::from(DB_PATH),
            schema: DEFAULT_SCHEMA.to_string(),
            download_dir: default_download_dir(),
            use_cache: false,
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            keep_existing_data: false,
            recreate_tables: false,
            skip_unknown_references: false,
            parse_error_limit: 0,
            continue_on_error: false,
            include_hierarchy: false,
            include_alternate_names: false,
            include_postal_codes: true,
        }
    }
}

/// Command-line options.
///
/// This struct is automatically generated by `clap` from the field attributes.
///
/// # Examples
///
/// ```bash
/// # Cities with 1000+ inhabitants plus reference data and postal codes
/// geonames-sql import cities1000
///
/// # Reuse downloads and keep the tables in a separate schema file
/// geonames-sql import cities15000 --use-cache --schema geonames
///
/// # Postal codes within 10 km of 10001
/// geonames-sql search 10001 --radius-km 10
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "geonames-sql",
    about = "Downloads GeoNames data and loads it into a SQLite database."
)]
pub struct Opt {
    /// Log level: error|warn|info|debug|trace
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of the binary.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download GeoNames files and import them
    Import(ImportArgs),
    /// List postal codes within a radius of every place sharing a postal code
    Search(SearchArgs),
}

/// Database location shared by both subcommands.
#[derive(Debug, Args)]
pub struct DatabaseArgs {
    /// Database path (SQLite file)
    #[arg(long = "db", value_parser, default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Schema name
    #[arg(long, default_value = DEFAULT_SCHEMA)]
    pub schema: String,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Primary geoname file to download
    #[arg(value_enum, default_value_t = Dataset::Cities1000)]
    pub dataset: Dataset,

    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Feature data language
    #[arg(short = 'l', long, default_value = DEFAULT_LANGUAGE_CODE)]
    pub language_code: String,

    /// Where to download the data files (default: ~/.geonames-sql)
    #[arg(short = 'D', long)]
    pub download_dir: Option<PathBuf>,

    /// Use previously downloaded files if they exist in the download directory
    #[arg(short = 'c', long)]
    pub use_cache: bool,

    /// Don't purge tables before inserting; duplicate keys become integrity errors
    #[arg(short = 'k', long)]
    pub keep_existing_data: bool,

    /// Drop and recreate the tables
    #[arg(short = 'r', long)]
    pub recreate_tables: bool,

    /// Skip hierarchy/alternate-name rows referencing geonames that were not imported
    #[arg(long)]
    pub skip_unknown_references: bool,

    /// Rows per INSERT statement
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Malformed lines tolerated per importer before it aborts
    #[arg(long, default_value_t = 0)]
    pub parse_error_limit: usize,

    /// Keep running independent importers after one fails
    #[arg(long)]
    pub continue_on_error: bool,

    /// Also import hierarchy.txt
    #[arg(long)]
    pub with_hierarchy: bool,

    /// Also import alternateNamesV2.txt
    #[arg(long)]
    pub with_alternate_names: bool,

    /// Skip the postal code dataset
    #[arg(long)]
    pub no_postal_codes: bool,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Postal code used as the anchor
    pub postal_code: String,

    /// Search radius in kilometers
    #[arg(long, default_value_t = 10.0)]
    pub radius_km: f64,

    #[command(flatten)]
    pub database: DatabaseArgs,
}

impl Config {
    /// Builds the library configuration from the `import` subcommand.
    pub fn from_import_args(args: ImportArgs, log_level: LogLevel, log_format: LogFormat) -> Self {
        Self {
            dataset: args.dataset,
            log_level,
            log_format,
            db_path: args.database.db_path,
            schema: args.database.schema,
            download_dir: args.download_dir.unwrap_or_else(default_download_dir),
            use_cache: args.use_cache,
            language_code: args.language_code,
            batch_size: args.batch_size,
            keep_existing_data: args.keep_existing_data,
            recreate_tables: args.recreate_tables,
            skip_unknown_references: args.skip_unknown_references,
            parse_error_limit: args.parse_error_limit,
            continue_on_error: args.continue_on_error,
            include_hierarchy: args.with_hierarchy,
            include_alternate_names: args.with_alternate_names,
            include_postal_codes: !args.no_postal_codes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.dataset, Dataset::Cities1000);
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.schema, "main");
        assert_eq!(config.language_code, "en");
        assert_eq!(config.parse_error_limit, 0);
        assert!(!config.keep_existing_data);
        assert!(!config.recreate_tables);
        assert!(config.include_postal_codes);
        assert_eq!(config.db_path, PathBuf::from("./geonames.db"));
    }

    #[test]
    fn test_dataset_file_names() {
        assert_eq!(Dataset::AllCountries.file_name(), "allCountries.txt");
        assert_eq!(Dataset::Cities15000.archive_name(), "cities15000.zip");
        assert_eq!(Dataset::Cities500.stem(), "cities500");
    }

    #[test]
    fn test_import_args_into_config() {
        let opt = Opt::parse_from([
            "geonames-sql",
            "import",
            "cities5000",
            "--db",
            "/tmp/g.db",
            "--keep-existing-data",
            "--no-postal-codes",
            "--batch-size",
            "250",
        ]);
        let Command::Import(args) = opt.command else {
            panic!("expected import subcommand");
        };
        let config = Config::from_import_args(args, opt.log_level, opt.log_format);
        assert_eq!(config.dataset, Dataset::Cities5000);
        assert_eq!(config.db_path, PathBuf::from("/tmp/g.db"));
        assert!(config.keep_existing_data);
        assert!(!config.include_postal_codes);
        assert_eq!(config.batch_size, 250);
    }

    #[test]
    fn test_search_args() {
        let opt = Opt::parse_from(["geonames-sql", "search", "10001", "--radius-km", "2.5"]);
        match opt.command {
            Command::Search(args) => {
                assert_eq!(args.postal_code, "10001");
                assert_eq!(args.radius_km, 2.5);
                assert_eq!(args.database.schema, "main");
            }
            Command::Import(_) => panic!("expected search subcommand"),
        }
    }
}
