use crate::models::{BoundingBox, GeoPartition};
use crate::utils::constants::{
    GRID_CELL_KM, KM_PER_DEGREE_LAT, NORWAY_MAX_LAT, NORWAY_MAX_LON, NORWAY_MIN_LAT,
    NORWAY_MIN_LON,
};

/// Longitude windows per latitude band, approximating the national boundary.
/// A grid cell is kept only when its center falls inside the window for its
/// band. (lat min, lat max, lon min, lon max)
const LATITUDE_BANDS: [(f64, f64, f64, f64); 10] = [
    (58.0, 59.0, 5.0, 9.5),
    (59.0, 60.5, 4.8, 11.8),
    (60.5, 62.0, 4.9, 12.5),
    (62.0, 63.5, 5.5, 12.0),
    (63.5, 65.0, 9.0, 14.0),
    (65.0, 66.5, 11.0, 15.5),
    (66.5, 68.0, 12.0, 17.5),
    (68.0, 69.5, 14.0, 21.0),
    (69.5, 70.5, 17.0, 27.0),
    (70.5, 71.2, 22.0, 31.0),
];

/// Whether a cell center lies inside the longitude window of its latitude band.
pub fn center_within_boundary(center_lat: f64, center_lon: f64) -> bool {
    LATITUDE_BANDS
        .iter()
        .any(|(lat_min, lat_max, lon_min, lon_max)| {
            center_lat >= *lat_min
                && center_lat < *lat_max
                && center_lon >= *lon_min
                && center_lon <= *lon_max
        })
}

/// Generate ~100x100 km grid cells covering mainland Norway.
///
/// Latitude is stepped in fixed ~100 km increments; within each latitude band
/// the longitude step is widened for meridian convergence
/// (`lon_step = 100 / (111 * cos(lat + half_step))`). Ids are `WG_{row}_{col}`
/// and disjoint by construction; bounding boxes may overlap by float epsilons
/// and are not deduplicated.
pub fn generate_weather_grids() -> Vec<GeoPartition> {
    let lat_step = GRID_CELL_KM / KM_PER_DEGREE_LAT;

    let mut grids = Vec::new();
    let mut row = 1u32;
    let mut lat = NORWAY_MIN_LAT;

    while lat < NORWAY_MAX_LAT {
        let band_center_lat = lat + lat_step / 2.0;
        let lon_step = GRID_CELL_KM / (KM_PER_DEGREE_LAT * band_center_lat.to_radians().cos());

        let mut col = 1u32;
        let mut lon = NORWAY_MIN_LON;

        while lon < NORWAY_MAX_LON {
            let bounds = BoundingBox::new(lat + lat_step, lon, lat, lon + lon_step);

            if center_within_boundary(bounds.center_lat(), bounds.center_lon()) {
                let grid_id = format!("WG_{:03}_{:03}", row, col);
                grids.push(GeoPartition::new(grid_id, None, bounds));
            }

            lon += lon_step;
            col += 1;
        }

        lat += lat_step;
        row += 1;
    }

    grids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::haversine_distance;
    use std::collections::HashSet;

    #[test]
    fn test_grid_generation_is_pure() {
        assert_eq!(generate_weather_grids(), generate_weather_grids());
    }

    #[test]
    fn test_grid_ids_unique() {
        let grids = generate_weather_grids();
        assert!(!grids.is_empty());
        let ids: HashSet<&str> = grids.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids.len(), grids.len());
    }

    #[test]
    fn test_grid_centers_satisfy_inclusion_predicate() {
        for grid in generate_weather_grids() {
            assert!(
                center_within_boundary(grid.center_lat(), grid.center_lon()),
                "cell {} center ({}, {}) escapes its latitude band window",
                grid.id,
                grid.center_lat(),
                grid.center_lon()
            );
        }
    }

    #[test]
    fn test_grid_cells_are_roughly_100km() {
        for grid in generate_weather_grids() {
            let b = grid.bounds;
            let height = haversine_distance(b.south_lat, b.west_lon, b.north_lat, b.west_lon);
            let width = haversine_distance(b.center_lat(), b.west_lon, b.center_lat(), b.east_lon);
            assert!(
                (85.0..=115.0).contains(&height),
                "cell {} height {} km",
                grid.id,
                height
            );
            assert!(
                (85.0..=115.0).contains(&width),
                "cell {} width {} km",
                grid.id,
                width
            );
        }
    }

    #[test]
    fn test_grid_rows_contiguous_in_latitude() {
        let grids = generate_weather_grids();
        // Any two cells from the same row share their latitude edges
        let first_row: Vec<_> = grids.iter().filter(|g| g.id.starts_with("WG_001_")).collect();
        for pair in first_row.windows(2) {
            assert_eq!(pair[0].bounds.south_lat, pair[1].bounds.south_lat);
            assert_eq!(pair[0].bounds.north_lat, pair[1].bounds.north_lat);
        }
    }
}
