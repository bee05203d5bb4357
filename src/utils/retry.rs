//! Error retriability for downloads.

use crate::error_handling::DownloadError;

/// Determines whether a failed download attempt should be retried.
///
/// # Retriable
///
/// - Timeouts, connection and request errors
/// - Server errors (5xx) and 429 Too Many Requests
/// - Interrupted or reset I/O while streaming the body
///
/// # Not retriable
///
/// - Other 4xx responses (the file does not exist, or access is denied)
/// - Broken archives, missing entries, bad URLs, unsupported languages
pub(crate) fn is_retriable_download_error(error: &DownloadError) -> bool {
    match error {
        DownloadError::Status { status, .. } => {
            status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
        }
        DownloadError::Http(e) => {
            if let Some(status) = e.status() {
                return status.is_server_error()
                    || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
            }
            e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
        }
        DownloadError::Io { source, .. } => matches!(
            source.kind(),
            std::io::ErrorKind::Interrupted
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::UnexpectedEof
        ),
        DownloadError::Archive { .. }
        | DownloadError::MissingEntry { .. }
        | DownloadError::UnsupportedLanguage(_)
        | DownloadError::Url(_)
        | DownloadError::NoFileName(_)
        | DownloadError::Join(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::path::PathBuf;

    fn status(code: StatusCode) -> DownloadError {
        DownloadError::Status {
            url: "https://download.geonames.org/export/dump/cities1000.zip".into(),
            status: code,
        }
    }

    #[test]
    fn test_server_errors_are_retriable() {
        assert!(is_retriable_download_error(&status(
            StatusCode::INTERNAL_SERVER_ERROR
        )));
        assert!(is_retriable_download_error(&status(
            StatusCode::SERVICE_UNAVAILABLE
        )));
        assert!(is_retriable_download_error(&status(
            StatusCode::TOO_MANY_REQUESTS
        )));
    }

    #[test]
    fn test_client_errors_are_not_retriable() {
        assert!(!is_retriable_download_error(&status(StatusCode::NOT_FOUND)));
        assert!(!is_retriable_download_error(&status(StatusCode::FORBIDDEN)));
    }

    #[test]
    fn test_io_errors() {
        let reset = DownloadError::Io {
            path: PathBuf::from("cities1000.zip"),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionReset),
        };
        let denied = DownloadError::Io {
            path: PathBuf::from("cities1000.zip"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(is_retriable_download_error(&reset));
        assert!(!is_retriable_download_error(&denied));
    }

    #[test]
    fn test_permanent_errors() {
        assert!(!is_retriable_download_error(
            &DownloadError::UnsupportedLanguage("xx".into())
        ));
        assert!(!is_retriable_download_error(&DownloadError::Url(
            url::ParseError::EmptyHost
        )));
        assert!(!is_retriable_download_error(&DownloadError::MissingEntry {
            path: PathBuf::from("hierarchy.zip"),
            entry: "hierarchy.txt".into(),
        }));
    }
}
