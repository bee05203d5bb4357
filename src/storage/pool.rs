//! SQLite connection management and the [`Store`] implementation.
//!
//! The pool is capped at one connection: it is the single shared session of a
//! run. Foreign keys are enforced and file databases use WAL mode. A schema
//! other than `main` is an attached database file next to the main one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use log::{debug, info};
use regex::Regex;
use sqlx::error::ErrorKind;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteQueryResult,
};
use sqlx::{QueryBuilder, Sqlite};

use crate::config::{DEFAULT_SCHEMA, SQLITE_MAX_BIND_PARAMS};
use crate::error_handling::ImportError;
use crate::parse::{BoundingBox, Record, Value};
use crate::storage::{Geoname, PostalCode, Store, Table};
use crate::utils::compile_regex_unsafe;

static SCHEMA_NAME: LazyLock<Regex> =
    LazyLock::new(|| compile_regex_unsafe(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$", "SCHEMA_NAME"));

const POSTAL_CODE_COLUMNS: &str = "country_code, postal_code, place_name, admin_name1, \
     admin_code1, admin_name2, admin_code2, admin_name3, admin_code3, latitude, longitude, \
     point, accuracy";

const GEONAME_COLUMNS: &str = "geonameid, name, asciiname, latitude, longitude, point, \
     feature_code, country_code, admin1_code, population, elevation, timezone_id, \
     modification_date";

const BOUNDING_BOX_FILTER: &str = "latitude BETWEEN ? AND ? \
     AND (longitude BETWEEN ? AND ? OR longitude BETWEEN ? AND ?)";

/// Schema names are interpolated into SQL, so only plain identifiers are accepted.
pub fn validate_schema_name(schema: &str) -> Result<(), ImportError> {
    if SCHEMA_NAME.is_match(schema) && !schema.eq_ignore_ascii_case("temp") {
        Ok(())
    } else {
        Err(ImportError::InvalidSchema(schema.to_string()))
    }
}

/// SQLite-backed [`Store`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    schema: String,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `db_path`.
    ///
    /// # Errors
    ///
    /// `ImportError::Connection` if the database cannot be opened or does not
    /// answer a trivial query; nothing has been touched at that point.
    pub async fn connect(db_path: &Path, schema: &str) -> Result<Self, ImportError> {
        validate_schema_name(schema)?;
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);
        let attach = (schema != DEFAULT_SCHEMA)
            .then(|| attached_database_path(db_path, schema).to_string_lossy().into_owned());
        let store = SqliteStore::connect_with(options, schema, attach).await?;
        info!(
            "Connected to {} (schema \"{}\")",
            db_path.display(),
            store.schema
        );
        Ok(store)
    }

    /// Opens a database an import has already populated, without creating
    /// anything.
    ///
    /// # Errors
    ///
    /// `ImportError::Connection` if the main or attached database file is
    /// missing or holds no imported tables.
    pub async fn open_existing(db_path: &Path, schema: &str) -> Result<Self, ImportError> {
        validate_schema_name(schema)?;
        let attach = (schema != DEFAULT_SCHEMA).then(|| attached_database_path(db_path, schema));
        for path in std::iter::once(db_path).chain(attach.as_deref()) {
            if !path.is_file() {
                return Err(ImportError::Connection(format!(
                    "{} does not exist; run an import first",
                    path.display()
                )));
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(false)
            .foreign_keys(true);
        let attach = attach.map(|path| path.to_string_lossy().into_owned());
        let store = SqliteStore::connect_with(options, schema, attach).await?;

        let sql = format!(
            "SELECT COUNT(*) FROM \"{schema}\".sqlite_master WHERE type = 'table' AND name = ?"
        );
        let found: i64 = sqlx::query_scalar(&sql)
            .bind(Table::Metadata.name())
            .fetch_one(&store.pool)
            .await
            .map_err(|e| ImportError::Connection(e.to_string()))?;
        if found == 0 {
            store.close().await;
            return Err(ImportError::Connection(format!(
                "{} (schema \"{schema}\") holds no imported data; run an import first",
                db_path.display()
            )));
        }
        debug!("Opened {} (schema \"{schema}\")", db_path.display());
        Ok(store)
    }

    /// Private in-memory database, mostly for tests and dry runs.
    pub async fn connect_in_memory(schema: &str) -> Result<Self, ImportError> {
        validate_schema_name(schema)?;
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| ImportError::Connection(e.to_string()))?
            .foreign_keys(true);
        let attach = (schema != DEFAULT_SCHEMA).then(|| ":memory:".to_string());
        SqliteStore::connect_with(options, schema, attach).await
    }

    async fn connect_with(
        options: SqliteConnectOptions,
        schema: &str,
        attach: Option<String>,
    ) -> Result<Self, ImportError> {
        let schema_name = schema.to_string();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .after_connect(move |conn, _meta| {
                let attach = attach.clone();
                let schema = schema_name.clone();
                Box::pin(async move {
                    if let Some(file) = attach {
                        let sql = format!("ATTACH DATABASE ? AS \"{schema}\"");
                        sqlx::query(&sql).bind(file).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect_with(options)
            .await
            .map_err(|e| ImportError::Connection(e.to_string()))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| ImportError::Connection(e.to_string()))?;

        Ok(SqliteStore {
            pool,
            schema: schema.to_string(),
        })
    }

    /// Underlying pool, for ad hoc queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn qualified(&self, table: Table) -> String {
        format!("\"{}\".\"{}\"", self.schema, table.name())
    }

    async fn execute(&self, table: Table, sql: &str) -> Result<SqliteQueryResult, ImportError> {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(table, e))
    }
}

/// `<dir of db_path>/<schema>.db`
fn attached_database_path(db_path: &Path, schema: &str) -> PathBuf {
    db_path.with_file_name(format!("{schema}.db"))
}

/// Constraint violations become [`ImportError::Integrity`]; everything else
/// stays a plain database error.
fn map_sqlx_error(table: Table, error: sqlx::Error) -> ImportError {
    if let sqlx::Error::Database(db) = &error {
        match db.kind() {
            ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => {
                return ImportError::Integrity {
                    table: table.name(),
                    detail: db.message().to_string(),
                };
            }
            _ => {}
        }
    }
    ImportError::Database(error)
}

fn push_value(row: &mut sqlx::query_builder::Separated<'_, '_, Sqlite, &'static str>, value: &Value) {
    match value {
        Value::Null => row.push_bind(None::<String>),
        Value::Text(s) => row.push_bind(s.clone()),
        Value::Integer(i) => row.push_bind(*i),
        Value::Decimal(d) => row.push_bind(*d),
        Value::Flag(b) => row.push_bind(*b),
        Value::Date(d) => row.push_bind(*d),
        Value::Point(p) => row.push_bind(p.to_wkt()),
    };
}

fn bind_bounding_box<'q, O>(
    query: sqlx::query::QueryAs<'q, Sqlite, O, sqlx::sqlite::SqliteArguments<'q>>,
    bbox: &BoundingBox,
) -> sqlx::query::QueryAs<'q, Sqlite, O, sqlx::sqlite::SqliteArguments<'q>> {
    let [(west_a, east_a), (west_b, east_b)] = bbox.longitude_ranges;
    query
        .bind(bbox.min_latitude)
        .bind(bbox.max_latitude)
        .bind(west_a)
        .bind(east_a)
        .bind(west_b)
        .bind(east_b)
}

impl Store for SqliteStore {
    fn schema(&self) -> &str {
        &self.schema
    }

    async fn create_tables(&self, recreate: bool) -> Result<(), ImportError> {
        if recreate {
            info!("Dropping existing tables in schema \"{}\"", self.schema);
            for table in Table::ALL.iter().rev() {
                self.execute(*table, &table.drop_statement(&self.schema))
                    .await?;
            }
        }
        for table in Table::ALL {
            for statement in table.create_statements(&self.schema) {
                self.execute(table, &statement).await?;
            }
        }
        debug!("Tables ready in schema \"{}\"", self.schema);
        Ok(())
    }

    async fn purge(&self) -> Result<u64, ImportError> {
        let mut removed = 0;
        for table in Table::ALL.iter().rev() {
            let result = self
                .execute(*table, &format!("DELETE FROM {}", self.qualified(*table)))
                .await?;
            if result.rows_affected() > 0 {
                debug!("Purged {} rows from {}", result.rows_affected(), table);
            }
            removed += result.rows_affected();
        }
        info!("Purged {} rows from schema \"{}\"", removed, self.schema);
        Ok(removed)
    }

    async fn count(&self, table: Table) -> Result<u64, ImportError> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.qualified(table)))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(table, e))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn existing_keys(
        &self,
        table: Table,
        column: &str,
        values: &[Value],
    ) -> Result<HashSet<String>, ImportError> {
        let mut wanted: Vec<&Value> = Vec::new();
        let mut seen = HashSet::new();
        for value in values {
            if let Some(key) = value.as_key() {
                if seen.insert(key) {
                    wanted.push(value);
                }
            }
        }

        let mut found = HashSet::new();
        for chunk in wanted.chunks(SQLITE_MAX_BIND_PARAMS) {
            let mut builder = QueryBuilder::<Sqlite>::new(format!(
                "SELECT CAST(\"{column}\" AS TEXT) FROM {} WHERE \"{column}\" IN (",
                self.qualified(table)
            ));
            let mut separated = builder.separated(", ");
            for value in chunk {
                match value {
                    Value::Integer(i) => separated.push_bind(*i),
                    other => separated.push_bind(other.as_key().unwrap_or_default()),
                };
            }
            builder.push(")");
            let keys: Vec<String> = builder
                .build_query_scalar()
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error(table, e))?;
            found.extend(keys);
        }
        Ok(found)
    }

    async fn insert_batch(&self, records: &[Record]) -> Result<u64, ImportError> {
        let Some(first) = records.first() else {
            return Ok(0);
        };
        let schema = first.schema();
        let table = schema.table;
        let columns = schema
            .column_names()
            .map(|name| format!("\"{name}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let max_rows = (SQLITE_MAX_BIND_PARAMS / schema.columns.len().max(1)).max(1);

        let mut inserted = 0;
        for chunk in records.chunks(max_rows) {
            let mut builder = QueryBuilder::<Sqlite>::new(format!(
                "INSERT INTO {} ({columns}) ",
                self.qualified(table)
            ));
            builder.push_values(chunk, |mut row, record| {
                for value in record.values() {
                    push_value(&mut row, value);
                }
            });
            let result = builder
                .build()
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error(table, e))?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    async fn record_update(&self, at: DateTime<Utc>) -> Result<(), ImportError> {
        let sql = format!(
            "INSERT INTO {} (id, last_updated) VALUES (1, ?) \
             ON CONFLICT(id) DO UPDATE SET last_updated = excluded.last_updated",
            self.qualified(Table::Metadata)
        );
        sqlx::query(&sql)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(Table::Metadata, e))?;
        Ok(())
    }

    async fn last_updated(&self) -> Result<Option<DateTime<Utc>>, ImportError> {
        let sql = format!(
            "SELECT last_updated FROM {} WHERE id = 1",
            self.qualified(Table::Metadata)
        );
        sqlx::query_scalar(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(Table::Metadata, e))
    }

    async fn postal_codes_by_code(
        &self,
        postal_code: &str,
    ) -> Result<Vec<PostalCode>, ImportError> {
        let sql = format!(
            "SELECT {POSTAL_CODE_COLUMNS} FROM {} WHERE postal_code = ? \
             ORDER BY country_code, postal_code, place_name",
            self.qualified(Table::PostalCode)
        );
        sqlx::query_as(&sql)
            .bind(postal_code)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(Table::PostalCode, e))
    }

    async fn postal_codes_in(&self, bbox: &BoundingBox) -> Result<Vec<PostalCode>, ImportError> {
        let sql = format!(
            "SELECT {POSTAL_CODE_COLUMNS} FROM {} WHERE {BOUNDING_BOX_FILTER}",
            self.qualified(Table::PostalCode)
        );
        bind_bounding_box(sqlx::query_as(&sql), bbox)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(Table::PostalCode, e))
    }

    async fn geonames_in(&self, bbox: &BoundingBox) -> Result<Vec<Geoname>, ImportError> {
        let sql = format!(
            "SELECT {GEONAME_COLUMNS} FROM {} WHERE {BOUNDING_BOX_FILTER}",
            self.qualified(Table::Geoname)
        );
        bind_bounding_box(sqlx::query_as(&sql), bbox)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(Table::Geoname, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_line, COUNTRY, FEATURE, HIERARCHY};
    use crate::storage::test_helpers::{create_test_store, insert_lines};

    #[test]
    fn test_schema_name_validation() {
        assert!(validate_schema_name("main").is_ok());
        assert!(validate_schema_name("geo_2024").is_ok());
        assert!(validate_schema_name("temp").is_err());
        assert!(validate_schema_name("1geo").is_err());
        assert!(validate_schema_name("geo\"; DROP TABLE country; --").is_err());
        assert!(validate_schema_name("").is_err());
    }

    #[test]
    fn test_attached_database_lives_next_to_main() {
        assert_eq!(
            attached_database_path(Path::new("/data/geonames.db"), "geo"),
            PathBuf::from("/data/geo.db")
        );
        assert_eq!(
            attached_database_path(Path::new("geonames.db"), "geo"),
            PathBuf::from("geo.db")
        );
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() {
        let store = create_test_store().await;
        store.create_tables(false).await.unwrap();
        for table in Table::ALL {
            assert_eq!(store.count(table).await.unwrap(), 0, "{table}");
        }
    }

    #[tokio::test]
    async fn test_insert_and_count() {
        let store = create_test_store().await;
        let inserted = insert_lines(
            &store,
            &FEATURE,
            &["A.ADM1\tfirst-order\t", "P.PPL\tpopulated place\t"],
        )
        .await
        .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.count(Table::Feature).await.unwrap(), 2);
        assert_eq!(store.insert_batch(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_key_is_integrity_error() {
        let store = create_test_store().await;
        insert_lines(&store, &FEATURE, &["A.ADM1\tfirst\t"])
            .await
            .unwrap();
        let err = insert_lines(&store, &FEATURE, &["A.ADM1\tagain\t"])
            .await
            .unwrap_err();
        assert!(
            matches!(err, ImportError::Integrity { table: "feature", .. }),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let store = create_test_store().await;
        let err = insert_lines(&store, &HIERARCHY, &["1\t2\tADM"])
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Integrity { table: "hierarchy", .. }));
    }

    #[tokio::test]
    async fn test_purge_is_idempotent() {
        let store = create_test_store().await;
        assert_eq!(store.purge().await.unwrap(), 0);
        insert_lines(&store, &FEATURE, &["A.ADM1\tfirst\t", "P.PPL\tplace\t"])
            .await
            .unwrap();
        store.record_update(Utc::now()).await.unwrap();
        assert_eq!(store.purge().await.unwrap(), 3);
        assert_eq!(store.purge().await.unwrap(), 0);
        assert_eq!(store.last_updated().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_recreate_drops_rows() {
        let store = create_test_store().await;
        insert_lines(&store, &FEATURE, &["A.ADM1\tfirst\t"])
            .await
            .unwrap();
        store.create_tables(true).await.unwrap();
        assert_eq!(store.count(Table::Feature).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_existing_keys() {
        let store = create_test_store().await;
        insert_lines(&store, &FEATURE, &["A.ADM1\tfirst\t", "P.PPL\tplace\t"])
            .await
            .unwrap();
        let keys = store
            .existing_keys(
                Table::Feature,
                "feature_code",
                &[
                    Value::Text("PPL".into()),
                    Value::Text("XYZ".into()),
                    Value::Null,
                    Value::Text("PPL".into()),
                ],
            )
            .await
            .unwrap();
        assert_eq!(keys, HashSet::from(["PPL".to_string()]));
        assert!(store
            .existing_keys(Table::Feature, "feature_code", &[])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_metadata_upsert() {
        let store = create_test_store().await;
        assert_eq!(store.last_updated().await.unwrap(), None);
        let first = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let second = DateTime::parse_from_rfc3339("2024-06-01T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        store.record_update(first).await.unwrap();
        store.record_update(second).await.unwrap();
        assert_eq!(store.last_updated().await.unwrap(), Some(second));
        assert_eq!(store.count(Table::Metadata).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_attached_schema() {
        let store = SqliteStore::connect_in_memory("geo").await.unwrap();
        store.create_tables(false).await.unwrap();
        let record = parse_line(
            &COUNTRY,
            "AD\tAND\t020\tAN\tAndorra\tAndorra la Vella\t468\t77006\tEU\t.ad\tEUR\tEuro\t376\tAD###\t^(?:AD)*(\\d{3})$\tca\t3041565\tES,FR\t",
            1,
        )
        .unwrap();
        assert_eq!(store.insert_batch(&[record]).await.unwrap(), 1);
        let in_geo: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM \"geo\".\"country\"")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(in_geo, 1);
    }

    #[tokio::test]
    async fn test_connect_failure_is_connection_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing").join("geonames.db");
        let err = SqliteStore::connect(&path, "main").await.unwrap_err();
        assert!(matches!(err, ImportError::Connection(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_open_existing_never_creates() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("geonames.db");
        let err = SqliteStore::open_existing(&path, "main").await.unwrap_err();
        assert!(matches!(err, ImportError::Connection(_)), "{err:?}");
        assert!(!path.exists());

        // A database without imported tables is refused too.
        let empty = SqliteStore::connect(&path, "main").await.unwrap();
        empty.close().await;
        let err = SqliteStore::open_existing(&path, "main").await.unwrap_err();
        assert!(err.to_string().contains("run an import first"), "{err}");

        let store = SqliteStore::connect(&path, "main").await.unwrap();
        store.create_tables(false).await.unwrap();
        store.close().await;
        let store = SqliteStore::open_existing(&path, "main").await.unwrap();
        assert_eq!(store.count(Table::Country).await.unwrap(), 0);
        store.close().await;

        let err = SqliteStore::open_existing(&path, "geo").await.unwrap_err();
        assert!(matches!(err, ImportError::Connection(_)), "{err:?}");
        assert!(!dir.path().join("geo.db").exists());
    }
}
