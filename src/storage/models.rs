// storage/models.rs
// Row types read back from the store

use chrono::NaiveDate;
use serde::Serialize;

use crate::parse::GeoPoint;

/// One postal code row. The primary key is `(country_code, postal_code, place_name)`.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PostalCode {
    pub country_code: String,
    pub postal_code: String,
    pub place_name: String,
    pub admin_name1: String,
    pub admin_code1: String,
    pub admin_name2: String,
    pub admin_code2: String,
    pub admin_name3: String,
    pub admin_code3: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip)]
    pub point: GeoPoint,
    pub accuracy: Option<i64>,
}

impl PostalCode {
    pub fn key(&self) -> (String, String, String) {
        (
            self.country_code.clone(),
            self.postal_code.clone(),
            self.place_name.clone(),
        )
    }
}

/// The columns of a geoname row used by search results.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Geoname {
    pub geonameid: i64,
    pub name: String,
    pub asciiname: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip)]
    pub point: GeoPoint,
    pub feature_code: Option<String>,
    pub country_code: Option<String>,
    pub admin1_code: String,
    pub population: i64,
    pub elevation: Option<i64>,
    pub timezone_id: Option<String>,
    pub modification_date: Option<NaiveDate>,
}
