// Shared test helpers for store setup and fixture files.
//
// Fixture lines follow the GeoNames layouts column for column; each test writes
// the files it needs into its own temporary directory.

use std::path::{Path, PathBuf};

use geonames_sql::{SqliteStore, Store};
use tempfile::TempDir;

pub const COUNTRIES: &str = concat!(
    "# ISO\tISO3\tISO-Numeric\tfips\tCountry\tCapital\tArea(in sq km)\tPopulation\tContinent\ttld\tCurrencyCode\tCurrencyName\tPhone\tPostal Code Format\tPostal Code Regex\tLanguages\tgeonameid\tneighbours\tEquivalentFipsCode\n",
    "AD\tAND\t020\tAN\tAndorra\tAndorra la Vella\t468\t77006\tEU\t.ad\tEUR\tEuro\t376\tAD###\t^(?:AD)*(\\d{3})$\tca\t3041565\tES,FR\t\n",
    "FR\tFRA\t250\tFR\tFrance\tParis\t547030\t66987244\tEU\t.fr\tEUR\tEuro\t33\t#####\t^(\\d{5})$\tfr-FR,frp,br,co,ca,eu,oc\t3017382\tCH,DE,BE,LU,IT,AD,MC,ES\t\n",
    "US\tUSA\t840\tUS\tUnited States\tWashington\t9629091\t327167434\tNA\t.us\tUSD\tDollar\t1\t#####-####\t^\\d{5}(-\\d{4})?$\ten-US,es-US,haw,fr\t6252001\tCA,MX,CU\t\n",
);

pub const FEATURES: &str = "P.PPL\tpopulated place\ta city, town, village, or other agglomeration of buildings where people live and work\nP.PPLC\tcapital of a political entity\t\n";

/// One geoname main-file line with empty alternate names and admin codes.
#[allow(dead_code)] // Used by other test files
pub fn geoname_line(id: u32, name: &str, lat: f64, lon: f64, code: &str, country: &str) -> String {
    format!(
        "{id}\t{name}\t{name}\t\t{lat}\t{lon}\tP\t{code}\t{country}\t\t00\t\t\t\t1000\t\t100\t\t2023-01-15"
    )
}

/// Five geonames spread over the three fixture countries.
#[allow(dead_code)] // Used by other test files
pub fn five_geonames() -> String {
    [
        geoname_line(3041563, "Andorra la Vella", 42.50779, 1.52109, "PPLC", "AD"),
        geoname_line(3039163, "Sant Julia de Loria", 42.46372, 1.49129, "PPL", "AD"),
        geoname_line(2988507, "Paris", 48.85341, 2.3488, "PPLC", "FR"),
        geoname_line(5128581, "New York City", 40.71427, -74.00597, "PPL", "US"),
        geoname_line(4140963, "Washington", 38.89511, -77.03637, "PPLC", "US"),
    ]
    .join("\n")
        + "\n"
}

/// One postal code line for the United States.
#[allow(dead_code)] // Used by other test files
pub fn postal_line(code: &str, place: &str, lat: f64, lon: f64) -> String {
    format!("US\t{code}\t{place}\tNew York\tNY\tNew York\t061\t\t\t{lat}\t{lon}\t4")
}

/// Writes `contents` to `relative` under `dir`, creating parent directories.
pub fn write_fixture(dir: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    std::fs::write(&path, contents).expect("Failed to write fixture");
    path
}

/// Country, feature and geoname fixture files, in that order.
#[allow(dead_code)] // Used by other test files
pub fn reference_and_geonames(dir: &TempDir) -> Vec<PathBuf> {
    vec![
        write_fixture(dir.path(), "countryInfo.txt", COUNTRIES),
        write_fixture(dir.path(), "featureCodes_en.txt", FEATURES),
        write_fixture(dir.path(), "cities1000.txt", &five_geonames()),
    ]
}

/// Creates a store in a file under `dir` with every table created.
pub async fn create_test_store(dir: &TempDir) -> SqliteStore {
    let store = SqliteStore::connect(&dir.path().join("geonames.db"), "main")
        .await
        .expect("Failed to open test database");
    store
        .create_tables(false)
        .await
        .expect("Failed to create tables");
    store
}
