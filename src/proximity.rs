//! Radius queries over stored points.
//!
//! Candidates come from a latitude/longitude bounding-box query against the
//! store; the exact great-circle distance is then checked here, so any
//! [`Store`] backend gives the same answer.

use std::collections::BTreeMap;

use log::debug;

use crate::error_handling::ImportError;
use crate::parse::GeoPoint;
use crate::storage::{Geoname, PostalCode, Store};

/// Rows carrying a geographic point.
pub trait Located {
    fn point(&self) -> GeoPoint;

    /// Great-circle distance to `other`, in meters.
    fn distance_to(&self, other: &impl Located) -> f64 {
        self.point().distance_meters(&other.point())
    }
}

impl Located for PostalCode {
    fn point(&self) -> GeoPoint {
        self.point
    }
}

impl Located for Geoname {
    fn point(&self) -> GeoPoint {
        self.point
    }
}

/// Kilometers to meters, rejecting negative and non-finite radii.
fn radius_meters(radius_km: f64) -> Result<f64, ImportError> {
    if radius_km.is_finite() && radius_km >= 0.0 {
        Ok(radius_km * 1000.0)
    } else {
        Err(ImportError::InvalidRadius(radius_km))
    }
}

/// Postal code rows within `radius_km` of any row carrying `postal_code`.
///
/// A postal code shared by several places has one anchor per place; the
/// result is the union over all anchors, each row appearing once, ordered by
/// primary key. An unknown postal code yields an empty result.
pub async fn postal_codes_around<S: Store>(
    store: &S,
    postal_code: &str,
    radius_km: f64,
) -> Result<Vec<PostalCode>, ImportError> {
    let radius = radius_meters(radius_km)?;
    let anchors = store.postal_codes_by_code(postal_code).await?;
    if anchors.is_empty() {
        debug!("No rows for postal code {postal_code:?}");
        return Ok(Vec::new());
    }

    let mut found = BTreeMap::new();
    for anchor in &anchors {
        for row in store
            .postal_codes_in(&anchor.point.bounding_box(radius))
            .await?
        {
            if anchor.distance_to(&row) <= radius {
                found.entry(row.key()).or_insert(row);
            }
        }
    }
    debug!(
        "{} rows within {} km of {} anchor(s) for {:?}",
        found.len(),
        radius_km,
        anchors.len(),
        postal_code
    );
    Ok(found.into_values().collect())
}

/// Postal code rows within `radius_km` of `center`, ordered by primary key.
pub async fn postal_codes_within<S: Store>(
    store: &S,
    center: GeoPoint,
    radius_km: f64,
) -> Result<Vec<PostalCode>, ImportError> {
    let radius = radius_meters(radius_km)?;
    let mut rows: Vec<PostalCode> = store
        .postal_codes_in(&center.bounding_box(radius))
        .await?
        .into_iter()
        .filter(|row| center.distance_meters(&row.point) <= radius)
        .collect();
    rows.sort_by_key(PostalCode::key);
    Ok(rows)
}

/// Geoname rows within `radius_km` of `center`, ordered by id.
pub async fn geonames_within_radius<S: Store>(
    store: &S,
    center: GeoPoint,
    radius_km: f64,
) -> Result<Vec<Geoname>, ImportError> {
    let radius = radius_meters(radius_km)?;
    let mut rows: Vec<Geoname> = store
        .geonames_in(&center.bounding_box(radius))
        .await?
        .into_iter()
        .filter(|row| center.distance_meters(&row.point) <= radius)
        .collect();
    rows.sort_by_key(|row| row.geonameid);
    Ok(rows)
}

impl PostalCode {
    /// Postal code rows within `radius_km` of this row, itself included.
    pub async fn within_radius_of<S: Store>(
        &self,
        store: &S,
        radius_km: f64,
    ) -> Result<Vec<PostalCode>, ImportError> {
        postal_codes_within(store, self.point, radius_km).await
    }
}

impl Geoname {
    /// Geoname rows within `radius_km` of this one, itself included.
    pub async fn within_radius_of<S: Store>(
        &self,
        store: &S,
        radius_km: f64,
    ) -> Result<Vec<Geoname>, ImportError> {
        geonames_within_radius(store, self.point, radius_km).await
    }
}
