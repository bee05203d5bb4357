//! Typed values produced by the record parser.

use std::fmt;

use chrono::NaiveDate;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{Sqlite, SqliteTypeInfo, SqliteValueRef};

use crate::config::EARTH_RADIUS_METERS;

/// A WGS84 point (SRID 4326).
///
/// Construction validates the coordinate ranges, so every `GeoPoint` in the
/// system is a valid latitude/longitude pair. Stored as WKT, `POINT(lon lat)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Returns `None` unless latitude is in [-90, 90] and longitude in [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude)
        {
            Some(GeoPoint {
                latitude,
                longitude,
            })
        } else {
            None
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Well-known text, longitude first.
    pub fn to_wkt(&self) -> String {
        format!("POINT({} {})", self.longitude, self.latitude)
    }

    /// Parses `POINT(lon lat)` as written by [`GeoPoint::to_wkt`].
    pub fn from_wkt(wkt: &str) -> Option<Self> {
        let inner = wkt
            .trim()
            .strip_prefix("POINT(")
            .and_then(|rest| rest.strip_suffix(')'))?;
        let mut parts = inner.split_whitespace();
        let longitude = parts.next()?.parse().ok()?;
        let latitude = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        GeoPoint::new(latitude, longitude)
    }

    /// Great-circle distance in meters (haversine on the mean Earth radius).
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
    }

    /// Latitude/longitude box containing every point within `radius_meters`.
    pub fn bounding_box(&self, radius_meters: f64) -> BoundingBox {
        // Small margin so points sitting exactly on the radius survive the prefilter.
        let angular = radius_meters / EARTH_RADIUS_METERS + 1e-9;
        let lat_delta = angular.to_degrees();
        let min_latitude = (self.latitude - lat_delta).max(-90.0);
        let max_latitude = (self.latitude + lat_delta).min(90.0);

        let full = (-180.0, 180.0);
        let cos_lat = self.latitude.to_radians().cos();
        if min_latitude <= -90.0 || max_latitude >= 90.0 || angular.sin() >= cos_lat {
            return BoundingBox {
                min_latitude,
                max_latitude,
                longitude_ranges: [full, full],
            };
        }

        let lon_delta = (angular.sin() / cos_lat).asin().to_degrees();
        let min_longitude = self.longitude - lon_delta;
        let max_longitude = self.longitude + lon_delta;
        let longitude_ranges = if min_longitude < -180.0 {
            [(-180.0, max_longitude), (min_longitude + 360.0, 180.0)]
        } else if max_longitude > 180.0 {
            [(min_longitude, 180.0), (-180.0, max_longitude - 360.0)]
        } else {
            [(min_longitude, max_longitude), (min_longitude, max_longitude)]
        };
        BoundingBox {
            min_latitude,
            max_latitude,
            longitude_ranges,
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wkt())
    }
}

impl sqlx::Type<Sqlite> for GeoPoint {
    fn type_info() -> SqliteTypeInfo {
        <String as sqlx::Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as sqlx::Type<Sqlite>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, Sqlite> for GeoPoint {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let text = <&str as sqlx::Decode<Sqlite>>::decode(value)?;
        GeoPoint::from_wkt(text).ok_or_else(|| format!("invalid point value {text:?}").into())
    }
}

/// Range prefilter for proximity queries.
///
/// Longitude is expressed as two ranges so boxes crossing the antimeridian
/// need no special casing in SQL; when the box does not wrap both ranges are equal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub longitude_ranges: [(f64, f64); 2],
}

impl BoundingBox {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&point.latitude())
            && self
                .longitude_ranges
                .iter()
                .any(|(min, max)| (*min..=*max).contains(&point.longitude()))
    }
}

/// One typed column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Flag(bool),
    Date(NaiveDate),
    Point(GeoPoint),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<GeoPoint> {
        match self {
            Value::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// Key used to match reference values against stored keys.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            _ => None,
        }
    }

    /// Renders the value the way it appears in a GeoNames file.
    pub fn to_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Flag(true) => "1".to_string(),
            Value::Flag(false) => String::new(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Point(p) => p.to_wkt(),
        }
    }
}
