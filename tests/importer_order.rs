//! Importer scheduling over every permutation of a file set.

use std::path::PathBuf;

use geonames_sql::import::build_importers;
use geonames_sql::parse::FileFormat;

fn permutations(items: &[&'static str]) -> Vec<Vec<&'static str>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let first = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, first);
            out.push(tail);
        }
    }
    out
}

fn position(formats: &[FileFormat], format: FileFormat) -> usize {
    formats
        .iter()
        .position(|f| *f == format)
        .expect("format scheduled")
}

#[test]
fn test_geonames_after_reference_data_and_before_alternate_names() {
    let files = [
        "countryInfo.txt",
        "featureCodes_en.txt",
        "allCountries.txt",
        "alternateNamesV2.txt",
    ];
    let all = permutations(&files);
    assert_eq!(all.len(), 24);

    for names in all {
        let paths: Vec<PathBuf> = names.iter().map(PathBuf::from).collect();
        let formats: Vec<FileFormat> = build_importers(&paths)
            .unwrap()
            .iter()
            .map(|importer| importer.format())
            .collect();
        let geoname = position(&formats, FileFormat::Geoname);
        assert!(position(&formats, FileFormat::Country) < geoname, "{names:?}");
        assert!(position(&formats, FileFormat::Feature) < geoname, "{names:?}");
        assert!(
            geoname < position(&formats, FileFormat::AlternateNamesV2),
            "{names:?}"
        );
    }
}

#[test]
fn test_postal_codes_after_geonames() {
    let paths: Vec<PathBuf> = [
        "dl/postal_codes/allCountries.txt",
        "dl/allCountries.txt",
        "dl/countryInfo.txt",
        "dl/featureCodes_en.txt",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();
    let formats: Vec<FileFormat> = build_importers(&paths)
        .unwrap()
        .iter()
        .map(|importer| importer.format())
        .collect();
    assert_eq!(
        formats,
        vec![
            FileFormat::Country,
            FileFormat::Feature,
            FileFormat::Geoname,
            FileFormat::PostalCode,
        ]
    );
}
