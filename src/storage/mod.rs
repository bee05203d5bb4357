// storage/mod.rs
// Database operations module
//
// Importers talk to a `Store`; `SqliteStore` is the implementation shipped
// with the crate.

mod models;
mod pool;
mod tables;

#[cfg(test)]
pub mod test_helpers;

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error_handling::ImportError;
use crate::parse::{BoundingBox, Record, Value};

pub use models::{Geoname, PostalCode};
pub use pool::{validate_schema_name, SqliteStore};
pub use tables::Table;

/// Table-scoped persistence operations used by the import pipeline and the
/// proximity search.
///
/// Every table name is resolved inside the store's schema namespace.
#[allow(async_fn_in_trait)]
pub trait Store {
    /// Schema namespace the tables live in.
    fn schema(&self) -> &str;

    /// Creates every table and index that does not exist yet. With `recreate`
    /// all managed tables are dropped first, children before parents.
    async fn create_tables(&self, recreate: bool) -> Result<(), ImportError>;

    /// Deletes every row of every managed table, children before parents.
    /// Returns the number of rows removed.
    async fn purge(&self) -> Result<u64, ImportError>;

    async fn count(&self, table: Table) -> Result<u64, ImportError>;

    /// Which of `values` exist in `table.column`, rendered as text keys
    /// (see [`Value::as_key`]).
    async fn existing_keys(
        &self,
        table: Table,
        column: &str,
        values: &[Value],
    ) -> Result<HashSet<String>, ImportError>;

    /// Inserts records of one schema into its table. Returns rows inserted.
    async fn insert_batch(&self, records: &[Record]) -> Result<u64, ImportError>;

    async fn record_update(&self, at: DateTime<Utc>) -> Result<(), ImportError>;

    async fn last_updated(&self) -> Result<Option<DateTime<Utc>>, ImportError>;

    /// Every row carrying this postal code, in primary key order.
    async fn postal_codes_by_code(&self, postal_code: &str)
        -> Result<Vec<PostalCode>, ImportError>;

    /// Postal code rows whose coordinates fall inside the box.
    async fn postal_codes_in(&self, bbox: &BoundingBox) -> Result<Vec<PostalCode>, ImportError>;

    /// Geoname rows whose coordinates fall inside the box.
    async fn geonames_in(&self, bbox: &BoundingBox) -> Result<Vec<Geoname>, ImportError>;
}
