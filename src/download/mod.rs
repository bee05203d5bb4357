//! Fetching and unpacking GeoNames files.
//!
//! Downloads stream to a `.part` file that is renamed once complete, so an
//! interrupted transfer is never mistaken for a cached copy.

mod catalog;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use url::Url;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::app::log_download_progress;
use crate::config::{
    DOWNLOAD_TIMEOUT, PROGRESS_LOG_INTERVAL, RETRY_FACTOR, RETRY_INITIAL_DELAY_MS,
    RETRY_MAX_ATTEMPTS, RETRY_MAX_DELAY_SECS,
};
use crate::error_handling::DownloadError;
use crate::utils::is_retriable_download_error;

pub use catalog::{download_plan, Extract, Includes, RemoteFile};

/// HTTP client used for every download of a run.
pub fn build_client() -> Result<Client, DownloadError> {
    Ok(Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .build()?)
}

/// Backoff between download attempts; yields one delay per retry.
fn retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(RETRY_INITIAL_DELAY_MS)
        .factor(RETRY_FACTOR)
        .max_delay(Duration::from_secs(RETRY_MAX_DELAY_SECS))
        .take(RETRY_MAX_ATTEMPTS.saturating_sub(1))
}

fn file_name_of(url: &Url) -> Result<&str, DownloadError> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| DownloadError::NoFileName(url.to_string()))
}

fn io_error(path: &Path) -> impl Fn(std::io::Error) -> DownloadError + '_ {
    move |source| DownloadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Downloads `url` into `dir` and returns the local path.
///
/// With `use_cache`, an existing file of the same name is returned without
/// touching the network. Transient failures (timeouts, resets, 5xx, 429) are
/// retried with exponential backoff.
pub async fn download(
    client: &Client,
    url: &Url,
    dir: &Path,
    use_cache: bool,
) -> Result<PathBuf, DownloadError> {
    let file_name = file_name_of(url)?;
    let target = dir.join(file_name);
    if use_cache && tokio::fs::try_exists(&target).await.unwrap_or(false) {
        info!("Using cached {}", target.display());
        return Ok(target);
    }

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(io_error(dir))?;
    let partial = dir.join(format!("{file_name}.part"));
    let start = Instant::now();
    info!("Downloading {url}");

    let bytes = RetryIf::spawn(
        retry_strategy(),
        || stream_to_file(client, url, &partial),
        |e: &DownloadError| {
            let retry = is_retriable_download_error(e);
            if retry {
                warn!("Download of {url} failed, retrying: {e}");
            }
            retry
        },
    )
    .await?;

    tokio::fs::rename(&partial, &target)
        .await
        .map_err(io_error(&target))?;
    info!(
        "Downloaded {} ({} bytes in {:.1}s)",
        target.display(),
        bytes,
        start.elapsed().as_secs_f64()
    );
    Ok(target)
}

async fn stream_to_file(client: &Client, url: &Url, path: &Path) -> Result<u64, DownloadError> {
    let mut response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status,
        });
    }

    let total = response.content_length();
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(io_error(path))?;
    let mut received = 0u64;
    let mut last_log = Instant::now();

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await.map_err(io_error(path))?;
        received += chunk.len() as u64;
        if last_log.elapsed() >= PROGRESS_LOG_INTERVAL {
            log_download_progress(&name, received, total);
            last_log = Instant::now();
        }
    }
    file.flush().await.map_err(io_error(path))?;
    Ok(received)
}

/// Extracts `entry` from `archive` into `dir` and returns its path.
pub async fn unzip(archive: &Path, entry: &str, dir: &Path) -> Result<PathBuf, DownloadError> {
    let (archive, entry, dir) = (archive.to_path_buf(), entry.to_string(), dir.to_path_buf());
    tokio::task::spawn_blocking(move || extract_entry(&archive, &entry, &dir)).await?
}

/// Extracts every `.txt` entry except `readme.txt` into `dir`, flattening any
/// directories inside the archive. Paths are returned in archive order.
pub async fn unzip_all(archive: &Path, dir: &Path) -> Result<Vec<PathBuf>, DownloadError> {
    let (archive, dir) = (archive.to_path_buf(), dir.to_path_buf());
    tokio::task::spawn_blocking(move || extract_text_entries(&archive, &dir)).await?
}

fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>, DownloadError> {
    let file = File::open(path).map_err(io_error(path))?;
    ZipArchive::new(BufReader::new(file)).map_err(|source| DownloadError::Archive {
        path: path.to_path_buf(),
        source,
    })
}

fn copy_entry(reader: &mut impl std::io::Read, target: &Path) -> Result<u64, DownloadError> {
    let mut out = File::create(target).map_err(io_error(target))?;
    std::io::copy(reader, &mut out).map_err(io_error(target))
}

fn extract_entry(archive_path: &Path, entry: &str, dir: &Path) -> Result<PathBuf, DownloadError> {
    std::fs::create_dir_all(dir).map_err(io_error(dir))?;
    let mut archive = open_archive(archive_path)?;
    let mut file = match archive.by_name(entry) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => {
            return Err(DownloadError::MissingEntry {
                path: archive_path.to_path_buf(),
                entry: entry.to_string(),
            })
        }
        Err(source) => {
            return Err(DownloadError::Archive {
                path: archive_path.to_path_buf(),
                source,
            })
        }
    };
    let target = dir.join(entry);
    let bytes = copy_entry(&mut file, &target)?;
    debug!("Extracted {} ({} bytes)", target.display(), bytes);
    Ok(target)
}

fn extract_text_entries(archive_path: &Path, dir: &Path) -> Result<Vec<PathBuf>, DownloadError> {
    std::fs::create_dir_all(dir).map_err(io_error(dir))?;
    let mut archive = open_archive(archive_path)?;
    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|source| DownloadError::Archive {
                path: archive_path.to_path_buf(),
                source,
            })?;
        if !file.is_file() {
            continue;
        }
        let Some(name) = file
            .enclosed_name()
            .and_then(|path| path.file_name().map(|name| name.to_os_string()))
        else {
            warn!("Skipping unsafe entry {:?} in {}", file.name(), archive_path.display());
            continue;
        };
        let lower = name.to_string_lossy().to_ascii_lowercase();
        if !lower.ends_with(".txt") || lower == "readme.txt" {
            continue;
        }
        let target = dir.join(&name);
        copy_entry(&mut file, &target)?;
        extracted.push(target);
    }
    debug!(
        "Extracted {} file(s) from {}",
        extracted.len(),
        archive_path.display()
    );
    Ok(extracted)
}

/// Downloads and unpacks every file of `plan` under `dir`.
///
/// Returns the data files to import, in plan order.
pub async fn fetch_plan(
    client: &Client,
    plan: &[RemoteFile],
    dir: &Path,
    use_cache: bool,
) -> Result<Vec<PathBuf>, DownloadError> {
    let mut files = Vec::new();
    for remote in plan {
        let target_dir = match remote.subdir {
            Some(subdir) => dir.join(subdir),
            None => dir.to_path_buf(),
        };
        let local = download(client, &remote.url, &target_dir, use_cache).await?;
        match &remote.extract {
            Extract::Plain => files.push(local),
            Extract::Entry(entry) => {
                let extracted = target_dir.join(entry);
                if use_cache && extracted.is_file() {
                    debug!("Using cached {}", extracted.display());
                    files.push(extracted);
                } else {
                    files.push(unzip(&local, entry, &target_dir).await?);
                }
            }
            Extract::AllText => files.extend(unzip_all(&local, &target_dir).await?),
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, contents) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_retry_strategy_length() {
        assert_eq!(retry_strategy().count(), RETRY_MAX_ATTEMPTS - 1);
    }

    #[test]
    fn test_file_name_of_url() {
        let url = Url::parse("https://download.geonames.org/export/dump/cities1000.zip").unwrap();
        assert_eq!(file_name_of(&url).unwrap(), "cities1000.zip");
        let dir = Url::parse("https://download.geonames.org/export/dump/").unwrap();
        assert!(matches!(file_name_of(&dir), Err(DownloadError::NoFileName(_))));
    }

    #[tokio::test]
    async fn test_cached_file_skips_network() {
        let dir = TempDir::new().unwrap();
        let cached = dir.path().join("countryInfo.txt");
        std::fs::write(&cached, "AD\tAND\n").unwrap();
        // Unroutable host: reaching the network would fail the test.
        let url = Url::parse("http://127.0.0.1:9/countryInfo.txt").unwrap();
        let client = build_client().unwrap();
        let path = download(&client, &url, dir.path(), true).await.unwrap();
        assert_eq!(path, cached);
    }

    #[tokio::test]
    async fn test_unzip_single_entry() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("cities1000.zip");
        write_zip(&archive, &[("cities1000.txt", "1\tA\n2\tB\n")]);

        let out = dir.path().join("out");
        let path = unzip(&archive, "cities1000.txt", &out).await.unwrap();
        assert_eq!(path, out.join("cities1000.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1\tA\n2\tB\n");
    }

    #[tokio::test]
    async fn test_unzip_missing_entry() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("hierarchy.zip");
        write_zip(&archive, &[("other.txt", "")]);
        let result = unzip(&archive, "hierarchy.txt", dir.path()).await;
        assert!(matches!(
            result,
            Err(DownloadError::MissingEntry { entry, .. }) if entry == "hierarchy.txt"
        ));
    }

    #[tokio::test]
    async fn test_unzip_all_skips_readme() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("allCountries.zip");
        write_zip(
            &archive,
            &[
                ("readme.txt", "about"),
                ("US.txt", "US\t10001\n"),
                ("GB.txt", "GB\tSW1A\n"),
                ("notes.csv", "x"),
            ],
        );

        let out = dir.path().join("postal_codes");
        let paths = unzip_all(&archive, &out).await.unwrap();
        assert_eq!(paths, vec![out.join("US.txt"), out.join("GB.txt")]);
        assert!(!out.join("readme.txt").exists());
    }

    #[tokio::test]
    async fn test_broken_archive() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"not a zip").unwrap();
        assert!(matches!(
            unzip_all(&archive, dir.path()).await,
            Err(DownloadError::Archive { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_plan_from_cache() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("countryInfo.txt"), "").unwrap();
        write_zip(
            &dir.path().join("cities15000.zip"),
            &[("cities15000.txt", "")],
        );
        let plan = vec![
            RemoteFile {
                url: Url::parse("http://127.0.0.1:9/countryInfo.txt").unwrap(),
                subdir: None,
                extract: Extract::Plain,
            },
            RemoteFile {
                url: Url::parse("http://127.0.0.1:9/cities15000.zip").unwrap(),
                subdir: None,
                extract: Extract::Entry("cities15000.txt".into()),
            },
        ];
        let client = build_client().unwrap();
        let files = fetch_plan(&client, &plan, dir.path(), true).await.unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("countryInfo.txt"),
                dir.path().join("cities15000.txt"),
            ]
        );
    }
}
