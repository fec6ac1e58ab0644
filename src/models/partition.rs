use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{avalanche_regions, generate_weather_grids};

/// Geographic bounding box, corner-addressed the way the upstream region
/// catalogue is maintained: north-west and south-east corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct BoundingBox {
    #[validate(range(min = -90.0, max = 90.0))]
    pub north_lat: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub west_lon: f64,

    #[validate(range(min = -90.0, max = 90.0))]
    pub south_lat: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub east_lon: f64,
}

impl BoundingBox {
    pub fn new(north_lat: f64, west_lon: f64, south_lat: f64, east_lon: f64) -> Self {
        Self {
            north_lat,
            west_lon,
            south_lat,
            east_lon,
        }
    }

    pub fn center_lat(&self) -> f64 {
        (self.north_lat + self.south_lat) / 2.0
    }

    pub fn center_lon(&self) -> f64 {
        (self.west_lon + self.east_lon) / 2.0
    }
}

/// A geospatial ingestion partition: a named avalanche region or a generated
/// weather grid cell. Created once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPartition {
    pub id: String,
    pub name: Option<String>,
    pub bounds: BoundingBox,
}

impl GeoPartition {
    pub fn new(id: impl Into<String>, name: Option<String>, bounds: BoundingBox) -> Self {
        Self {
            id: id.into(),
            name,
            bounds,
        }
    }

    pub fn center_lat(&self) -> f64 {
        self.bounds.center_lat()
    }

    pub fn center_lon(&self) -> f64 {
        self.bounds.center_lon()
    }

    /// Display name, falling back to the id for generated cells.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    AvalancheRegions,
    WeatherGrids,
}

/// Enumerate the partitions of a kind in deterministic order (stable by id),
/// so resource naming and fan-out are reproducible across runs.
pub fn list_partitions(kind: PartitionKind) -> Vec<GeoPartition> {
    let mut partitions = match kind {
        PartitionKind::AvalancheRegions => avalanche_regions(),
        PartitionKind::WeatherGrids => generate_weather_grids(),
    };
    partitions.sort_by(|a, b| a.id.cmp(&b.id));
    partitions
}
