//! End-of-run summary.

use log::info;

use crate::import::ImporterReport;

/// Logs one line per importer followed by its non-zero counters, then a total.
pub fn print_import_summary(reports: &[ImporterReport], elapsed_seconds: f64) {
    for report in reports {
        info!(
            "{} -> {}: {} rows in {:.2}s",
            report.importer,
            report.table,
            report.rows_inserted(),
            report.elapsed.as_secs_f64()
        );
        for (counter, value) in report.stats.non_zero() {
            info!("   {}: {}", counter, value);
        }
    }
    let total: u64 = reports.iter().map(ImporterReport::rows_inserted).sum();
    info!(
        "✅ Imported {} rows with {} importer(s) in {:.1}s",
        total,
        reports.len(),
        elapsed_seconds
    );
}
