//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (download locations, batch limits, retry settings)
//! - The library `Config` value
//! - CLI option types and parsing

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{
    default_download_dir, Command, Config, DatabaseArgs, Dataset, ImportArgs, LogFormat, LogLevel,
    Opt, SearchArgs,
};
