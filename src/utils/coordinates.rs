use crate::error::{IngestError, Result};
use crate::utils::constants::{NORWAY_MAX_LAT, NORWAY_MAX_LON, NORWAY_MIN_LAT, NORWAY_MIN_LON};

/// Validate that a coordinate pair falls within the Norwegian ingestion bounds
pub fn validate_norway_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(NORWAY_MIN_LAT..=NORWAY_MAX_LAT).contains(&latitude) {
        return Err(IngestError::Config(format!(
            "Latitude {} is outside Norway bounds [{}, {}]",
            latitude, NORWAY_MIN_LAT, NORWAY_MAX_LAT
        )));
    }

    if !(NORWAY_MIN_LON..=NORWAY_MAX_LON).contains(&longitude) {
        return Err(IngestError::Config(format!(
            "Longitude {} is outside Norway bounds [{}, {}]",
            longitude, NORWAY_MIN_LON, NORWAY_MAX_LON
        )));
    }

    Ok(())
}

/// Calculate the distance between two points using the Haversine formula
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}
