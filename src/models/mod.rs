pub mod grid;
pub mod partition;
pub mod regions;

pub use grid::generate_weather_grids;
pub use partition::{list_partitions, BoundingBox, GeoPartition, PartitionKind};
pub use regions::avalanche_regions;
