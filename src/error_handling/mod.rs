//! Error handling and import statistics.
//!
//! This module provides:
//! - Error type definitions for importing, downloading and initialization
//! - Per-importer statistics tracking

mod stats;
mod types;

// Re-export public API
pub use stats::ImportStats;
pub use types::{DownloadError, ImportCounter, ImportError, InitializationError};

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_import_stats_initialization() {
        let stats = ImportStats::new();
        for counter in ImportCounter::iter() {
            assert_eq!(stats.get(counter), 0);
        }
        assert!(stats.non_zero().is_empty());
    }

    #[test]
    fn test_import_stats_increment_and_add() {
        let stats = ImportStats::new();
        stats.increment(ImportCounter::LinesSkipped);
        stats.increment(ImportCounter::LinesSkipped);
        stats.add(ImportCounter::RowsInserted, 1000);
        stats.add(ImportCounter::RowsInserted, 5);

        assert_eq!(stats.get(ImportCounter::LinesSkipped), 2);
        assert_eq!(stats.get(ImportCounter::RowsInserted), 1005);
        assert_eq!(
            stats.non_zero(),
            vec![
                (ImportCounter::RowsInserted, 1005),
                (ImportCounter::LinesSkipped, 2)
            ]
        );
    }
}
