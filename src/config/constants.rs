//! Configuration constants.
//!
//! This module contains the constants used throughout the application:
//! - Download locations and retry settings
//! - Batching limits imposed by SQLite
//! - Progress logging cadence

use std::time::Duration;

// Remote locations
/// Base URL of the GeoNames dump directory (reference data and primary datasets).
pub const GEONAMES_DUMP_URL: &str = "https://download.geonames.org/export/dump/";
/// Base URL of the GeoNames postal code directory.
pub const GEONAMES_POSTAL_URL: &str = "https://download.geonames.org/export/zip/";

/// Directory (relative to the download directory) holding postal code files.
///
/// Postal code files share names with the primary dataset files (`allCountries.txt`,
/// `US.txt`), so the parent directory is what tells them apart.
pub const POSTAL_CODES_DIR: &str = "postal_codes";

/// Directory name used under `$HOME` for downloaded files.
pub const DOWNLOAD_DIR_NAME: &str = ".geonames-sql";

/// Feature code languages published by GeoNames (`featureCodes_<lang>.txt`).
pub const FEATURE_LANGUAGES: &[&str] = &["bg", "en", "nb", "nn", "no", "ru", "sv"];
pub const DEFAULT_LANGUAGE_CODE: &str = "en";

// Database
pub const DB_PATH: &str = "./geonames.db";
pub const DEFAULT_SCHEMA: &str = "main";

// Batching
/// Default number of rows per multi-row INSERT.
pub const DEFAULT_BATCH_SIZE: usize = 1000;
/// SQLite's default ceiling on bound parameters per statement (SQLITE_MAX_VARIABLE_NUMBER).
pub const SQLITE_MAX_BIND_PARAMS: usize = 32766;

// Progress logging
pub const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(5);

// Download retry configuration
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;
pub const RETRY_FACTOR: u64 = 2;
pub const RETRY_MAX_DELAY_SECS: u64 = 15;
/// Maximum number of attempts per download (initial + retries).
pub const RETRY_MAX_ATTEMPTS: usize = 3;
/// Per-request timeout; the primary archives are several hundred megabytes.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60 * 30);

// Proximity search
/// Mean Earth radius (IUGG) in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;
