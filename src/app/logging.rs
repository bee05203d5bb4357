//! Progress logging utilities.

use std::time::Instant;

use log::info;

/// Logs how far an importer is through its current file.
///
/// # Arguments
///
/// * `file_name` - File being read
/// * `fraction` - Bytes consumed so far as a fraction of the file size
/// * `lines` - Data lines read so far
/// * `start_time` - When reading the file started
pub fn log_progress(file_name: &str, fraction: f64, lines: u64, start_time: Instant) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let rate = if elapsed_secs > 0.0 {
        lines as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "{}: {:.1}% ({} lines in {:.2} seconds, ~{:.0} lines/sec)",
        file_name,
        fraction * 100.0,
        lines,
        elapsed_secs,
        rate
    );
}

/// Logs how much of a download has arrived.
///
/// `total` is the response's content length; without it only the byte count
/// is reported.
pub fn log_download_progress(file_name: &str, received: u64, total: Option<u64>) {
    match download_fraction(received, total) {
        Some(fraction) => info!(
            "⬇️  {}: {:.1}% ({:.1} MiB)",
            file_name,
            fraction * 100.0,
            received as f64 / MIB
        ),
        None => info!("⬇️  {}: {:.1} MiB", file_name, received as f64 / MIB),
    }
}

const MIB: f64 = 1024.0 * 1024.0;

/// Fraction of the expected byte length received so far, in `[0, 1]`.
pub fn download_fraction(received: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(0) | None => None,
        Some(total) => Some((received as f64 / total as f64).min(1.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_fraction() {
        assert_eq!(download_fraction(50, Some(200)), Some(0.25));
        assert_eq!(download_fraction(300, Some(200)), Some(1.0));
        assert_eq!(download_fraction(10, Some(0)), None);
        assert_eq!(download_fraction(10, None), None);
    }
}
