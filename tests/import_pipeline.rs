//! End-to-end import tests over fixture files.
//!
//! These drive `import_files` against a SQLite file in a temporary directory;
//! nothing touches the network.

mod helpers;

use geonames_sql::storage::Table;
use geonames_sql::{import_files, ImportCounter, ImportError, ImportOptions, Store};
use helpers::{
    create_test_store, five_geonames, geoname_line, reference_and_geonames, write_fixture,
};
use tempfile::TempDir;

#[tokio::test]
async fn test_reference_data_then_geonames() {
    let dir = TempDir::new().unwrap();
    let store = create_test_store(&dir).await;
    let paths = reference_and_geonames(&dir);

    let reports = import_files(&store, &paths, &ImportOptions::default())
        .await
        .expect("import succeeds");
    let rows: Vec<(Table, u64)> = reports
        .iter()
        .map(|report| (report.table, report.rows_inserted()))
        .collect();
    assert_eq!(
        rows,
        vec![(Table::Country, 3), (Table::Feature, 2), (Table::Geoname, 5)]
    );
    assert_eq!(reports[0].stats.get(ImportCounter::LinesSkipped), 1);

    let resolved: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM geoname WHERE country_code IS NOT NULL AND feature_code IS NOT NULL",
    )
    .fetch_one(store.pool())
    .await
    .unwrap();
    assert_eq!(resolved, 5);
}

#[tokio::test]
async fn test_keep_existing_data_rejects_duplicates() {
    let dir = TempDir::new().unwrap();
    let store = create_test_store(&dir).await;
    let paths = reference_and_geonames(&dir);
    import_files(&store, &paths, &ImportOptions::default())
        .await
        .unwrap();

    // Running again without a purge is what "keep existing data" amounts to.
    let err = import_files(&store, &paths[2..], &ImportOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_integrity(), "expected integrity error, got {err}");
    assert!(matches!(err, ImportError::Integrity { table: "geoname", .. }));
    assert_eq!(store.count(Table::Geoname).await.unwrap(), 5);
}

#[tokio::test]
async fn test_malformed_line_stops_the_importer() {
    let dir = TempDir::new().unwrap();
    let store = create_test_store(&dir).await;
    let mut paths = reference_and_geonames(&dir);
    let mut lines: Vec<String> = five_geonames().lines().map(str::to_string).collect();
    lines[2] = lines[2].replace("\t1000\t", "\tmany\t");
    paths[2] = write_fixture(dir.path(), "cities1000.txt", &lines.join("\n"));

    let options = ImportOptions {
        batch_size: 1,
        ..Default::default()
    };
    let err = import_files(&store, &paths, &options).await.unwrap_err();
    match err {
        ImportError::Parse { file, line, raw, .. } => {
            assert_eq!(file, "cities1000.txt");
            assert_eq!(line, 3);
            assert!(raw.contains("many"));
        }
        other => panic!("expected parse error, got {other}"),
    }
    // Lines before the malformed one were committed, nothing after it.
    assert_eq!(store.count(Table::Geoname).await.unwrap(), 2);
}

#[tokio::test]
async fn test_purge_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = create_test_store(&dir).await;
    assert_eq!(store.purge().await.unwrap(), 0);

    let paths = reference_and_geonames(&dir);
    import_files(&store, &paths, &ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(store.purge().await.unwrap(), 10);
    assert_eq!(store.purge().await.unwrap(), 0);

    import_files(&store, &paths, &ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(store.count(Table::Country).await.unwrap(), 3);
    assert_eq!(store.count(Table::Geoname).await.unwrap(), 5);
}

#[tokio::test]
async fn test_hierarchy_with_unknown_geonames() {
    let dir = TempDir::new().unwrap();
    let store = create_test_store(&dir).await;
    let mut paths = reference_and_geonames(&dir);
    paths.push(write_fixture(
        dir.path(),
        "hierarchy.txt",
        "3041563\t3039163\tADM\n3041563\t999\tADM\n",
    ));

    let err = import_files(&store, &paths, &ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ImportError::UnknownReference { line: 2, column: "child_id", .. }
    ));

    store.purge().await.unwrap();
    let options = ImportOptions {
        skip_unknown_references: true,
        ..Default::default()
    };
    let reports = import_files(&store, &paths, &options).await.unwrap();
    let hierarchy = reports.last().unwrap();
    assert_eq!(hierarchy.table, Table::Hierarchy);
    assert_eq!(hierarchy.rows_inserted(), 1);
    assert_eq!(hierarchy.stats.get(ImportCounter::UnknownReferenceRows), 1);
}

#[tokio::test]
async fn test_dependent_file_alone_is_refused() {
    let dir = TempDir::new().unwrap();
    let store = create_test_store(&dir).await;
    let path = write_fixture(
        dir.path(),
        "cities15000.txt",
        &geoname_line(1, "Nowhere", 0.0, 0.0, "PPL", "US"),
    );
    let err = import_files(&store, &[path], &ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::DependencyOrder { .. }));
}

#[tokio::test]
async fn test_unrecognized_file_fails_before_importing() {
    let dir = TempDir::new().unwrap();
    let store = create_test_store(&dir).await;
    let mut paths = reference_and_geonames(&dir);
    paths.push(write_fixture(dir.path(), "iso-languagecodes.txt", ""));

    let err = import_files(&store, &paths, &ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::UnrecognizedFile(_)));
    assert_eq!(store.count(Table::Country).await.unwrap(), 0);
}
