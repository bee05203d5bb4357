//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `geonames_sql` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use geonames_sql::config::{Command, Opt, SearchArgs};
use geonames_sql::initialization::init_logger_with;
use geonames_sql::{postal_codes_around, run_import, Config, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();

    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    let outcome = match opt.command {
        Command::Import(args) => {
            let config = Config::from_import_args(args, opt.log_level, opt.log_format);
            import(config).await
        }
        Command::Search(args) => search(args).await,
    };

    if let Err(e) = outcome {
        eprintln!("geonames-sql error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}

async fn import(config: Config) -> Result<()> {
    let report = run_import(config).await?;
    println!(
        "✅ Imported {} row{} into {} (schema \"{}\") in {:.1}s",
        report.rows_inserted(),
        if report.rows_inserted() == 1 { "" } else { "s" },
        report.db_path.display(),
        report.schema,
        report.elapsed_seconds
    );
    if !report.is_complete() {
        for failure in &report.failed {
            eprintln!("❌ {} ({}): {}", failure.importer, failure.table, failure.error);
        }
        anyhow::bail!("{} importer(s) did not complete", report.failed.len());
    }
    Ok(())
}

async fn search(args: SearchArgs) -> Result<()> {
    let store = SqliteStore::open_existing(&args.database.db_path, &args.database.schema)
        .await
        .context("Failed to open database")?;
    let rows = postal_codes_around(&store, &args.postal_code, args.radius_km)
        .await
        .with_context(|| format!("Search around {} failed", args.postal_code))?;
    for row in &rows {
        println!("{}", serde_json::to_string(row)?);
    }
    log::info!(
        "{} postal code row(s) within {} km of {}",
        rows.len(),
        args.radius_km,
        args.postal_code
    );
    store.close().await;
    Ok(())
}
