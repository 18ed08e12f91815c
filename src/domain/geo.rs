//! Geographic value types shared by carpools, users, and housing offers.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// A geocoded point: coordinates plus the human-readable address that
/// produced them.
///
/// Serialised shape matches the documents the original data set already
/// uses: `{ latitude, longitude, address }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Latitude in decimal degrees, `-90.0..=90.0`.
    #[schema(example = 39.4699)]
    pub latitude: f64,
    /// Longitude in decimal degrees, `-180.0..=180.0`.
    #[schema(example = -0.3763)]
    pub longitude: f64,
    /// Address text as resolved by the geocoder.
    #[schema(example = "Valencia, Spain")]
    pub address: String,
}

/// Validation failures for geographic coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoValidationError {
    /// Latitude outside `-90..=90` or not finite.
    #[error("latitude must be a finite value between -90 and 90")]
    InvalidLatitude,
    /// Longitude outside `-180..=180` or not finite.
    #[error("longitude must be a finite value between -180 and 180")]
    InvalidLongitude,
}

impl GeoPoint {
    /// Check that the coordinates describe a real point on the globe.
    pub fn validate(&self) -> Result<(), GeoValidationError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(GeoValidationError::InvalidLatitude);
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(GeoValidationError::InvalidLongitude);
        }
        Ok(())
    }
}
