use crate::models::{BoundingBox, GeoPartition};

/// Forecast regions published by the Norwegian avalanche warning service,
/// with hand-maintained bounding boxes. Region ids are the upstream ids.
/// (name, id, north lat, west lon, south lat, east lon)
const REGIONS: [(&str, &str, f64, f64, f64, f64); 24] = [
    // Svalbard
    ("Nordenskiöld Land", "3003", 78.2, 14.5, 77.6, 17.0),
    // Finnmark
    ("Finnmarkskysten", "3006", 71.2, 23.0, 70.4, 31.0),
    ("Vest-Finnmark", "3007", 71.0, 20.0, 68.8, 24.0),
    // Troms
    ("Nord-Troms", "3009", 70.8, 18.5, 69.8, 24.0),
    ("Lyngen", "3010", 69.9, 19.5, 69.4, 21.0),
    ("Tromsø", "3011", 69.8, 17.5, 69.2, 20.5),
    ("Sør-Troms", "3012", 69.5, 17.0, 68.7, 21.0),
    ("Indre Troms", "3013", 69.2, 18.0, 68.5, 22.0),
    // Nordland
    ("Lofoten og Vesterålen", "3014", 68.9, 12.0, 67.8, 15.5),
    ("Ofoten", "3015", 68.6, 15.5, 67.8, 18.5),
    ("Salten", "3016", 67.8, 13.5, 66.8, 16.5),
    ("Svartisen", "3017", 67.0, 13.0, 66.2, 15.5),
    ("Helgeland", "3018", 66.5, 12.0, 65.2, 15.0),
    // Trøndelag
    ("Trollheimen", "3022", 62.97, 8.68, 62.59, 9.70),
    // Møre og Romsdal
    ("Romsdal", "3023", 62.8, 6.5, 62.0, 8.5),
    ("Sunnmøre", "3024", 62.5, 5.5, 61.7, 8.0),
    // Vestland
    ("Indre Fjordane", "3026", 61.8, 5.0, 60.8, 8.5),
    ("Jotunheimen", "3028", 61.8, 7.5, 61.2, 9.0),
    ("Indre Sogn", "3029", 61.4, 6.5, 60.6, 8.5),
    ("Voss", "3031", 60.8, 6.0, 60.2, 7.5),
    // Buskerud / Innlandet
    ("Hallingdal", "3032", 61.0, 7.5, 60.2, 10.0),
    // Hardanger
    ("Hardanger", "3034", 60.8, 6.0, 59.8, 8.0),
    // Telemark
    ("Vest-Telemark", "3035", 59.8, 7.0, 59.0, 9.0),
    // Rogaland
    ("Heiane", "3037", 59.9, 5.0, 59.2, 6.5),
];

/// The static avalanche region catalogue as geo partitions.
pub fn avalanche_regions() -> Vec<GeoPartition> {
    REGIONS
        .iter()
        .map(|(name, id, north, west, south, east)| {
            GeoPartition::new(
                *id,
                Some((*name).to_string()),
                BoundingBox::new(*north, *west, *south, *east),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_region_count() {
        assert_eq!(avalanche_regions().len(), 24);
    }

    #[test]
    fn test_region_ids_unique() {
        let regions = avalanche_regions();
        let ids: HashSet<&str> = regions.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), regions.len());
    }

    #[test]
    fn test_region_boxes_are_oriented() {
        for region in avalanche_regions() {
            assert!(
                region.bounds.north_lat > region.bounds.south_lat,
                "region {} has inverted latitudes",
                region.id
            );
            assert!(
                region.bounds.east_lon > region.bounds.west_lon,
                "region {} has inverted longitudes",
                region.id
            );
        }
    }

    #[test]
    fn test_lyngen_center() {
        let lyngen = avalanche_regions()
            .into_iter()
            .find(|r| r.id == "3010")
            .unwrap();
        assert!((lyngen.center_lat() - 69.65).abs() < 1e-9);
        assert!((lyngen.center_lon() - 20.25).abs() < 1e-9);
    }
}
