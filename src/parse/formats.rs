//! GeoNames file formats.
//!
//! One [`Schema`] per file type, following the layouts documented in the
//! GeoNames readme (`download.geonames.org/export/dump/readme.txt` and
//! `export/zip/readme.txt`).

use strum_macros::EnumIter;

use crate::parse::schema::{Column, ColumnKind::*, Dialect, OnMissing, Schema, Source};
use crate::storage::Table;

/// Known GeoNames file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum FileFormat {
    /// `countryInfo.txt`
    Country,
    /// `featureCodes_<lang>.txt`
    Feature,
    /// `timeZones.txt`
    Timezone,
    /// `allCountries.txt`, `citiesN.txt` and per-country `XX.txt`
    Geoname,
    /// `hierarchy.txt`
    Hierarchy,
    /// `alternateNames.txt`
    AlternateNames,
    /// `alternateNamesV2.txt`
    AlternateNamesV2,
    /// Postal code `allCountries.txt` / `XX.txt`
    PostalCode,
}

impl FileFormat {
    pub fn schema(&self) -> &'static Schema {
        match self {
            FileFormat::Country => &COUNTRY,
            FileFormat::Feature => &FEATURE,
            FileFormat::Timezone => &TIMEZONE,
            FileFormat::Geoname => &GEONAME,
            FileFormat::Hierarchy => &HIERARCHY,
            FileFormat::AlternateNames => &ALTERNATE_NAMES,
            FileFormat::AlternateNamesV2 => &ALTERNATE_NAMES_V2,
            FileFormat::PostalCode => &POSTAL_CODE,
        }
    }

    pub fn table(&self) -> Table {
        self.schema().table
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.schema().name)
    }
}

static COUNTRY_COLUMNS: [Column; 19] = [
    Column::required("iso", Code(2), 0),
    Column::required("iso3", Code(3), 1),
    Column::required("iso_numeric", Integer, 2),
    Column::required("fips", Code(2), 3),
    Column::required("country", Text, 4),
    Column::required("capital", Text, 5),
    Column::optional("area_in_sq_km", Decimal(2), 6),
    Column::required("population", BigInt, 7),
    Column::required("continent", Code(2), 8),
    Column::required("tld", Text, 9),
    Column::required("currency_code", Code(3), 10),
    Column::required("currency_name", Text, 11),
    Column::required("phone", Text, 12),
    Column::required("postal_code_format", Text, 13),
    Column::required("postal_code_regex", Text, 14),
    Column::required("languages", Text, 15),
    Column::optional("geonameid", Integer, 16),
    Column::required("neighbours", Text, 17),
    Column::required("equivalent_fips_code", Text, 18),
];

pub static COUNTRY: Schema = Schema {
    name: "country info",
    table: Table::Country,
    dialect: Dialect::QuotedTab,
    fields: 19,
    header: false,
    columns: &COUNTRY_COLUMNS,
};

static FEATURE_COLUMNS: [Column; 4] = [
    Column::derived("feature_code", Code(10), Source::After(0, '.')),
    Column::derived("feature_class", Code(1), Source::Before(0, '.')),
    Column::required("name", Text, 1),
    Column::required("description", Text, 2),
];

pub static FEATURE: Schema = Schema {
    name: "feature codes",
    table: Table::Feature,
    dialect: Dialect::Tab,
    fields: 3,
    header: false,
    columns: &FEATURE_COLUMNS,
};

static TIMEZONE_COLUMNS: [Column; 5] = [
    Column::required("country_code", Code(2), 0),
    Column::required("timezone_id", Code(40), 1),
    Column::required("gmt_offset", Decimal(2), 2),
    Column::required("dst_offset", Decimal(2), 3),
    Column::required("raw_offset", Decimal(2), 4),
];

pub static TIMEZONE: Schema = Schema {
    name: "time zones",
    table: Table::Timezone,
    dialect: Dialect::Tab,
    fields: 5,
    header: true,
    columns: &TIMEZONE_COLUMNS,
};

// Raw field 6 (feature class) is implied by the feature code and not stored.
static GEONAME_COLUMNS: [Column; 19] = [
    Column::required("geonameid", Integer, 0),
    Column::required("name", Text, 1),
    Column::required("asciiname", Text, 2),
    Column::required("alternatenames", Text, 3),
    Column::required("latitude", Decimal(7), 4),
    Column::required("longitude", Decimal(7), 5),
    Column::optional("feature_code", Code(10), 7).references(
        Table::Feature,
        "feature_code",
        OnMissing::Null,
    ),
    Column::optional("country_code", Code(2), 8).references(
        Table::Country,
        "iso",
        OnMissing::Null,
    ),
    Column::required("cc2", Text, 9),
    Column::required("admin1_code", Text, 10),
    Column::required("admin2_code", Text, 11),
    Column::required("admin3_code", Text, 12),
    Column::required("admin4_code", Text, 13),
    Column::required("population", BigInt, 14),
    Column::optional("elevation", Integer, 15),
    Column::required("dem", Integer, 16),
    Column::optional("timezone_id", Code(40), 17).references(
        Table::Timezone,
        "timezone_id",
        OnMissing::Null,
    ),
    Column::optional("modification_date", Date, 18),
    Column::derived(
        "point",
        Point,
        Source::Point {
            latitude: "latitude",
            longitude: "longitude",
        },
    ),
];

pub static GEONAME: Schema = Schema {
    name: "geonames",
    table: Table::Geoname,
    dialect: Dialect::Tab,
    fields: 19,
    header: false,
    columns: &GEONAME_COLUMNS,
};

static HIERARCHY_COLUMNS: [Column; 3] = [
    Column::required("parent_id", Integer, 0).references(
        Table::Geoname,
        "geonameid",
        OnMissing::Reject,
    ),
    Column::required("child_id", Integer, 1).references(
        Table::Geoname,
        "geonameid",
        OnMissing::Reject,
    ),
    Column::required("relation_type", Text, 2),
];

pub static HIERARCHY: Schema = Schema {
    name: "hierarchy",
    table: Table::Hierarchy,
    dialect: Dialect::Tab,
    fields: 3,
    header: false,
    columns: &HIERARCHY_COLUMNS,
};

const ALTERNATE_NAME_BASE: [Column; 8] = [
    Column::required("alternate_name_id", Integer, 0),
    Column::required("geonameid", Integer, 1).references(
        Table::Geoname,
        "geonameid",
        OnMissing::Reject,
    ),
    Column::required("iso_language", Code(7), 2),
    Column::required("alternate_name", Text, 3),
    Column::required("is_preferred_name", Flag, 4),
    Column::required("is_short_name", Flag, 5),
    Column::required("is_colloquial", Flag, 6),
    Column::required("is_historic", Flag, 7),
];

static ALTERNATE_NAME_COLUMNS: [Column; 8] = ALTERNATE_NAME_BASE;

// V2 appends the period the name was in use.
static ALTERNATE_NAME_V2_COLUMNS: [Column; 10] = {
    let base = ALTERNATE_NAME_BASE;
    [
        base[0],
        base[1],
        base[2],
        base[3],
        base[4],
        base[5],
        base[6],
        base[7],
        Column::required("from_period", Text, 8),
        Column::required("to_period", Text, 9),
    ]
};

pub static ALTERNATE_NAMES: Schema = Schema {
    name: "alternate names",
    table: Table::AlternateName,
    dialect: Dialect::Tab,
    fields: 8,
    header: false,
    columns: &ALTERNATE_NAME_COLUMNS,
};

pub static ALTERNATE_NAMES_V2: Schema = Schema {
    name: "alternate names (v2)",
    table: Table::AlternateName,
    dialect: Dialect::Tab,
    fields: 10,
    header: false,
    columns: &ALTERNATE_NAME_V2_COLUMNS,
};

static POSTAL_CODE_COLUMNS: [Column; 13] = [
    Column::required("country_code", Code(2), 0).references(
        Table::Country,
        "iso",
        OnMissing::Reject,
    ),
    Column::required("postal_code", Code(20), 1),
    Column::required("place_name", Text, 2),
    Column::required("admin_name1", Text, 3),
    Column::required("admin_code1", Text, 4),
    Column::required("admin_name2", Text, 5),
    Column::required("admin_code2", Text, 6),
    Column::required("admin_name3", Text, 7),
    Column::required("admin_code3", Text, 8),
    Column::required("latitude", Decimal(7), 9),
    Column::required("longitude", Decimal(7), 10),
    Column::optional("accuracy", Integer, 11),
    Column::derived(
        "point",
        Point,
        Source::Point {
            latitude: "latitude",
            longitude: "longitude",
        },
    ),
];

pub static POSTAL_CODE: Schema = Schema {
    name: "postal codes",
    table: Table::PostalCode,
    dialect: Dialect::QuotedTab,
    fields: 12,
    header: false,
    columns: &POSTAL_CODE_COLUMNS,
};
