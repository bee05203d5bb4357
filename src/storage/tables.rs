//! Table definitions.
//!
//! Tables are declared in dependency order: every table only references tables
//! that come before it in [`Table::ALL`]. Creation walks the list forwards,
//! purging and dropping walk it backwards.

use strum_macros::EnumIter;

/// Tables managed by the importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
pub enum Table {
    Metadata,
    Country,
    Feature,
    Timezone,
    Geoname,
    Hierarchy,
    AlternateName,
    PostalCode,
}

impl Table {
    /// Every table, parents before children.
    pub const ALL: [Table; 8] = [
        Table::Metadata,
        Table::Country,
        Table::Feature,
        Table::Timezone,
        Table::Geoname,
        Table::Hierarchy,
        Table::AlternateName,
        Table::PostalCode,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Metadata => "metadata",
            Table::Country => "country",
            Table::Feature => "feature",
            Table::Timezone => "timezone",
            Table::Geoname => "geoname",
            Table::Hierarchy => "hierarchy",
            Table::AlternateName => "alternate_name",
            Table::PostalCode => "postal_code",
        }
    }

    /// Column definitions (everything between the parentheses of CREATE TABLE).
    fn columns(&self) -> &'static str {
        match self {
            Table::Metadata => {
                "id INTEGER PRIMARY KEY,
                last_updated TEXT NOT NULL"
            }
            Table::Country => {
                "iso TEXT PRIMARY KEY,
                iso3 TEXT NOT NULL,
                iso_numeric INTEGER NOT NULL,
                fips TEXT NOT NULL,
                country TEXT NOT NULL,
                capital TEXT NOT NULL,
                area_in_sq_km REAL,
                population INTEGER NOT NULL,
                continent TEXT NOT NULL,
                tld TEXT NOT NULL,
                currency_code TEXT NOT NULL,
                currency_name TEXT NOT NULL,
                phone TEXT NOT NULL,
                postal_code_format TEXT NOT NULL,
                postal_code_regex TEXT NOT NULL,
                languages TEXT NOT NULL,
                geonameid INTEGER,
                neighbours TEXT NOT NULL,
                equivalent_fips_code TEXT NOT NULL"
            }
            Table::Feature => {
                "feature_code TEXT PRIMARY KEY,
                feature_class TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL"
            }
            Table::Timezone => {
                "timezone_id TEXT PRIMARY KEY,
                country_code TEXT NOT NULL,
                gmt_offset REAL NOT NULL,
                dst_offset REAL NOT NULL,
                raw_offset REAL NOT NULL"
            }
            Table::Geoname => {
                "geonameid INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                asciiname TEXT NOT NULL,
                alternatenames TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                point TEXT NOT NULL,
                feature_code TEXT REFERENCES feature(feature_code),
                country_code TEXT REFERENCES country(iso),
                cc2 TEXT NOT NULL,
                admin1_code TEXT NOT NULL,
                admin2_code TEXT NOT NULL,
                admin3_code TEXT NOT NULL,
                admin4_code TEXT NOT NULL,
                population INTEGER NOT NULL,
                elevation INTEGER,
                dem INTEGER NOT NULL,
                timezone_id TEXT REFERENCES timezone(timezone_id),
                modification_date TEXT"
            }
            Table::Hierarchy => {
                "parent_id INTEGER NOT NULL REFERENCES geoname(geonameid),
                child_id INTEGER NOT NULL REFERENCES geoname(geonameid),
                relation_type TEXT NOT NULL,
                PRIMARY KEY (parent_id, child_id, relation_type)"
            }
            Table::AlternateName => {
                "alternate_name_id INTEGER PRIMARY KEY,
                geonameid INTEGER NOT NULL REFERENCES geoname(geonameid),
                iso_language TEXT NOT NULL,
                alternate_name TEXT NOT NULL,
                is_preferred_name INTEGER NOT NULL,
                is_short_name INTEGER NOT NULL,
                is_colloquial INTEGER NOT NULL,
                is_historic INTEGER NOT NULL,
                from_period TEXT NOT NULL DEFAULT '',
                to_period TEXT NOT NULL DEFAULT ''"
            }
            Table::PostalCode => {
                "country_code TEXT NOT NULL REFERENCES country(iso),
                postal_code TEXT NOT NULL,
                place_name TEXT NOT NULL,
                admin_name1 TEXT NOT NULL,
                admin_code1 TEXT NOT NULL,
                admin_name2 TEXT NOT NULL,
                admin_code2 TEXT NOT NULL,
                admin_name3 TEXT NOT NULL,
                admin_code3 TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                point TEXT NOT NULL,
                accuracy INTEGER,
                PRIMARY KEY (country_code, postal_code, place_name)"
            }
        }
    }

    /// Secondary indexes as (index name, indexed columns).
    fn indexes(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Table::Geoname => &[("idx_geoname_lat_lon", "latitude, longitude")],
            Table::Hierarchy => &[("idx_hierarchy_child", "child_id")],
            Table::AlternateName => &[("idx_alternate_name_geonameid", "geonameid")],
            Table::PostalCode => &[
                ("idx_postal_code_code", "postal_code"),
                ("idx_postal_code_lat_lon", "latitude, longitude"),
            ],
            _ => &[],
        }
    }

    /// Idempotent DDL for this table inside `schema`.
    pub fn create_statements(&self, schema: &str) -> Vec<String> {
        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS \"{schema}\".\"{}\" (\n                {}\n            )",
            self.name(),
            self.columns()
        )];
        for (index, columns) in self.indexes() {
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS \"{schema}\".\"{index}\" ON \"{}\" ({columns})",
                self.name()
            ));
        }
        statements
    }

    pub fn drop_statement(&self, schema: &str) -> String {
        format!("DROP TABLE IF EXISTS \"{schema}\".\"{}\"", self.name())
    }

    /// Tables that must be populated before rows can be inserted into this one.
    pub fn required_tables(&self) -> &'static [Table] {
        match self {
            Table::Geoname => &[Table::Country, Table::Feature],
            Table::Hierarchy | Table::AlternateName => &[Table::Geoname],
            Table::PostalCode => &[Table::Country],
            _ => &[],
        }
    }

    /// Tables that, when imported in the same run, must be loaded before this one.
    /// A superset of [`Table::required_tables`].
    pub fn preceding_tables(&self) -> &'static [Table] {
        match self {
            Table::Geoname => &[Table::Country, Table::Feature, Table::Timezone],
            Table::Hierarchy | Table::AlternateName => &[Table::Geoname],
            Table::PostalCode => &[Table::Country, Table::Geoname],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
