//! Maps local files to importers and orders them.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::config::POSTAL_CODES_DIR;
use crate::error_handling::ImportError;
use crate::import::Importer;
use crate::parse::FileFormat;
use crate::utils::compile_regex_unsafe;

static POSTAL_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex_unsafe(r"^(allCountries|[A-Z]{2})\.txt$", "POSTAL_FILE_RE"));
static FEATURE_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex_unsafe(r"^featureCodes_[a-z]{2}\.txt$", "FEATURE_FILE_RE"));
static GEONAME_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex_unsafe(
        r"^(allCountries|cities(500|1000|5000|15000)|[A-Z]{2})\.txt$",
        "GEONAME_FILE_RE",
    )
});

/// Resolves a local file to its format by name.
///
/// Postal code files reuse the primary dataset names (`allCountries.txt`,
/// `XX.txt`) and are told apart by their `postal_codes` parent directory.
pub fn detect_format(path: &Path) -> Result<FileFormat, ImportError> {
    let unrecognized = || ImportError::UnrecognizedFile(path.to_path_buf());
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(unrecognized)?;
    let in_postal_dir = path
        .parent()
        .and_then(Path::file_name)
        .is_some_and(|dir| dir == POSTAL_CODES_DIR);

    if in_postal_dir && POSTAL_FILE_RE.is_match(name) {
        return Ok(FileFormat::PostalCode);
    }
    match name {
        "countryInfo.txt" => Ok(FileFormat::Country),
        "timeZones.txt" => Ok(FileFormat::Timezone),
        "hierarchy.txt" => Ok(FileFormat::Hierarchy),
        "alternateNames.txt" => Ok(FileFormat::AlternateNames),
        "alternateNamesV2.txt" => Ok(FileFormat::AlternateNamesV2),
        _ if FEATURE_FILE_RE.is_match(name) => Ok(FileFormat::Feature),
        _ if GEONAME_FILE_RE.is_match(name) => Ok(FileFormat::Geoname),
        _ => Err(unrecognized()),
    }
}

/// Builds the ordered importer list for a set of local files.
///
/// Files of the same format share one importer (e.g. the per-country postal
/// code files of one archive), in the order they were supplied. Every path is
/// resolved before anything is built, so an unknown file fails the whole call.
pub fn build_importers(paths: &[PathBuf]) -> Result<Vec<Importer>, ImportError> {
    let mut grouped: Vec<(FileFormat, Vec<PathBuf>)> = Vec::new();
    for path in paths {
        let format = detect_format(path)?;
        debug!("{} -> {}", path.display(), format);
        match grouped.iter_mut().find(|(f, _)| *f == format) {
            Some((_, files)) => files.push(path.clone()),
            None => grouped.push((format, vec![path.clone()])),
        }
    }

    let importers = grouped
        .into_iter()
        .map(|(format, files)| Importer::new(format, files))
        .collect();
    order_importers(importers)
}

/// Topologically orders importers by their table dependencies.
///
/// Among importers that are ready at the same time, the one supplied first
/// runs first.
pub fn order_importers(importers: Vec<Importer>) -> Result<Vec<Importer>, ImportError> {
    let mut pending: Vec<Option<Importer>> = importers.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(pending.len());

    while ordered.len() < pending.len() {
        let ready = pending.iter().position(|candidate| {
            candidate.as_ref().is_some_and(|importer| {
                !pending.iter().flatten().any(|other| {
                    other.table() != importer.table() && importer.follows().contains(&other.table())
                })
            })
        });
        match ready.and_then(|i| pending[i].take()) {
            Some(importer) => ordered.push(importer),
            None => {
                // Every remaining importer waits on another remaining one.
                let blocked = pending.iter().flatten().next();
                return Err(ImportError::DependencyOrder {
                    importer: blocked.map(Importer::name).unwrap_or_default(),
                    missing: blocked
                        .and_then(|importer| importer.follows().first())
                        .map(|table| table.name())
                        .unwrap_or("unknown"),
                });
            }
        }
    }
    Ok(ordered)
}
