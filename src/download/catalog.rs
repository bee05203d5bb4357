//! Remote GeoNames files and how each one is unpacked.

use url::Url;

use crate::config::{
    Config, Dataset, FEATURE_LANGUAGES, GEONAMES_DUMP_URL, GEONAMES_POSTAL_URL, POSTAL_CODES_DIR,
};
use crate::error_handling::DownloadError;

/// What to do with a file once it is on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extract {
    /// The download is the data file itself.
    Plain,
    /// Extract one named entry from the archive.
    Entry(String),
    /// Extract every text entry except the readme.
    AllText,
}

/// One file of a download plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub url: Url,
    /// Subdirectory of the download directory the file is saved under.
    pub subdir: Option<&'static str>,
    pub extract: Extract,
}

impl RemoteFile {
    fn new(base: &str, name: &str, extract: Extract) -> Result<Self, DownloadError> {
        Ok(RemoteFile {
            url: Url::parse(base)?.join(name)?,
            subdir: None,
            extract,
        })
    }

    fn in_subdir(mut self, subdir: &'static str) -> Self {
        self.subdir = Some(subdir);
        self
    }
}

/// Optional datasets of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Includes {
    pub hierarchy: bool,
    pub alternate_names: bool,
    pub postal_codes: bool,
}

impl Default for Includes {
    fn default() -> Self {
        Self {
            hierarchy: false,
            alternate_names: false,
            postal_codes: true,
        }
    }
}

impl From<&Config> for Includes {
    fn from(config: &Config) -> Self {
        Self {
            hierarchy: config.include_hierarchy,
            alternate_names: config.include_alternate_names,
            postal_codes: config.include_postal_codes,
        }
    }
}

/// Files to fetch for one run: the reference data, exactly one primary
/// dataset and one feature language, plus the optional datasets.
pub fn download_plan(
    dataset: Dataset,
    language: &str,
    includes: Includes,
) -> Result<Vec<RemoteFile>, DownloadError> {
    if !FEATURE_LANGUAGES.contains(&language) {
        return Err(DownloadError::UnsupportedLanguage(language.to_string()));
    }

    let mut plan = vec![
        RemoteFile::new(GEONAMES_DUMP_URL, "countryInfo.txt", Extract::Plain)?,
        RemoteFile::new(GEONAMES_DUMP_URL, "timeZones.txt", Extract::Plain)?,
        RemoteFile::new(
            GEONAMES_DUMP_URL,
            &format!("featureCodes_{language}.txt"),
            Extract::Plain,
        )?,
        RemoteFile::new(
            GEONAMES_DUMP_URL,
            &dataset.archive_name(),
            Extract::Entry(dataset.file_name()),
        )?,
    ];
    if includes.hierarchy {
        plan.push(RemoteFile::new(
            GEONAMES_DUMP_URL,
            "hierarchy.zip",
            Extract::Entry("hierarchy.txt".into()),
        )?);
    }
    if includes.alternate_names {
        plan.push(RemoteFile::new(
            GEONAMES_DUMP_URL,
            "alternateNamesV2.zip",
            Extract::Entry("alternateNamesV2.txt".into()),
        )?);
    }
    if includes.postal_codes {
        // Same archive name as the primary allCountries dump.
        plan.push(
            RemoteFile::new(GEONAMES_POSTAL_URL, "allCountries.zip", Extract::AllText)?
                .in_subdir(POSTAL_CODES_DIR),
        );
    }
    Ok(plan)
}
