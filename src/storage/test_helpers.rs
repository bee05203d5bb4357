//! Shared test helpers for storage-backed unit tests.

use crate::error_handling::ImportError;
use crate::parse::{parse_line, Schema};
use crate::storage::{SqliteStore, Store};

/// In-memory store with every table created.
pub async fn create_test_store() -> SqliteStore {
    let store = SqliteStore::connect_in_memory("main")
        .await
        .expect("Failed to create test database");
    store
        .create_tables(false)
        .await
        .expect("Failed to create tables");
    store
}

/// Parses `lines` with `schema` and inserts them as one batch.
pub async fn insert_lines(
    store: &SqliteStore,
    schema: &'static Schema,
    lines: &[&str],
) -> Result<u64, ImportError> {
    let records = lines
        .iter()
        .enumerate()
        .map(|(i, line)| parse_line(schema, line, i as u64 + 1).expect("fixture line parses"))
        .collect::<Vec<_>>();
    store.insert_batch(&records).await
}
