//! Import statistics tracking.
//!
//! This module provides thread-safe counters for a single importer run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use strum::IntoEnumIterator;

use super::types::ImportCounter;

/// Thread-safe import statistics tracker.
///
/// Every counter is initialized to zero on creation, so lookups never miss.
/// Counters are atomic so a report can be shared with a progress logger while
/// the importer is still running.
pub struct ImportStats {
    counters: HashMap<ImportCounter, AtomicU64>,
}

impl ImportStats {
    pub fn new() -> Self {
        let mut counters = HashMap::new();
        for counter in ImportCounter::iter() {
            counters.insert(counter, AtomicU64::new(0));
        }
        ImportStats { counters }
    }

    /// Increment a counter by one.
    pub fn increment(&self, counter: ImportCounter) {
        self.add(counter, 1);
    }

    /// Add `amount` to a counter.
    pub fn add(&self, counter: ImportCounter, amount: u64) {
        if let Some(value) = self.counters.get(&counter) {
            value.fetch_add(amount, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to update counter {:?} which is not in the map. \
                 This indicates a bug in ImportStats initialization.",
                counter
            );
        }
    }

    /// Get the value of a counter.
    pub fn get(&self, counter: ImportCounter) -> u64 {
        self.counters
            .get(&counter)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Non-zero counters, in declaration order.
    pub fn non_zero(&self) -> Vec<(ImportCounter, u64)> {
        ImportCounter::iter()
            .map(|c| (c, self.get(c)))
            .filter(|(_, v)| *v > 0)
            .collect()
    }
}

impl Default for ImportStats {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for counter in ImportCounter::iter() {
            map.entry(&counter, &self.get(counter));
        }
        map.finish()
    }
}
