//! Run-time reporting helpers used by the import pipeline.
//!
//! - periodic progress lines while a file is being read
//! - the end-of-run summary

pub mod logging;
pub mod statistics;

pub use logging::{log_download_progress, log_progress};
pub use statistics::print_import_summary;
