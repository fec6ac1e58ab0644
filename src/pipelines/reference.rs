use serde_json::{json, Value};
use tracing::debug;

use crate::error::Result;
use crate::models::{list_partitions, GeoPartition, PartitionKind};
use crate::pipelines::{PipelineContext, PipelineStats};
use crate::utils::constants::{TABLE_AVALANCHE_REGIONS, TABLE_WEATHER_GRIDS};
use crate::warehouse::{Row, WriteMode};

/// Load the reference tables: the avalanche region catalogue and the weather
/// grid, with computed center coordinates. Replace-mode, since these are
/// regenerated wholesale from static configuration on every run.
pub async fn run(ctx: &PipelineContext) -> Result<PipelineStats> {
    let mut stats = PipelineStats::default();

    let regions = list_partitions(PartitionKind::AvalancheRegions);
    let rows: Vec<Row> = regions.iter().map(region_row).collect();
    debug!(regions = rows.len(), "loading region reference table");
    let summary = ctx
        .warehouse
        .load(TABLE_AVALANCHE_REGIONS, rows, &["region_id"], WriteMode::Replace)?;
    stats.rows_loaded += summary.rows_total;
    stats.partitions_ok += 1;

    let grids = list_partitions(PartitionKind::WeatherGrids);
    let rows: Vec<Row> = grids.iter().map(grid_row).collect();
    debug!(grids = rows.len(), "loading weather grid reference table");
    let summary = ctx
        .warehouse
        .load(TABLE_WEATHER_GRIDS, rows, &["grid_id"], WriteMode::Replace)?;
    stats.rows_loaded += summary.rows_total;
    stats.partitions_ok += 1;

    Ok(stats)
}

fn region_row(region: &GeoPartition) -> Row {
    let mut row = bounds_row(region);
    row.insert("region_id".to_string(), Value::String(region.id.clone()));
    row.insert(
        "name".to_string(),
        Value::String(region.display_name().to_string()),
    );
    row
}

fn grid_row(grid: &GeoPartition) -> Row {
    let mut row = bounds_row(grid);
    row.insert("grid_id".to_string(), Value::String(grid.id.clone()));
    row
}

fn bounds_row(partition: &GeoPartition) -> Row {
    let mut row = Row::new();
    row.insert("north_lat".to_string(), json!(partition.bounds.north_lat));
    row.insert("west_lon".to_string(), json!(partition.bounds.west_lon));
    row.insert("south_lat".to_string(), json!(partition.bounds.south_lat));
    row.insert("east_lon".to_string(), json!(partition.bounds.east_lon));
    row.insert("center_lat".to_string(), json!(partition.center_lat()));
    row.insert("center_lon".to_string(), json!(partition.center_lon()));
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;

    #[test]
    fn test_region_row_fields() {
        let region = GeoPartition::new(
            "3010",
            Some("Lyngen".to_string()),
            BoundingBox::new(69.9, 19.5, 69.4, 21.0),
        );
        let row = region_row(&region);

        assert_eq!(row["region_id"], json!("3010"));
        assert_eq!(row["name"], json!("Lyngen"));
        assert_eq!(row["center_lat"], json!(69.65));
        assert_eq!(row["center_lon"], json!(20.25));
    }

    #[test]
    fn test_grid_row_fields() {
        let grid = GeoPartition::new("WG_001_002", None, BoundingBox::new(59.0, 6.0, 58.0, 8.0));
        let row = grid_row(&grid);

        assert_eq!(row["grid_id"], json!("WG_001_002"));
        assert!(row.contains_key("center_lat"));
        assert!(!row.contains_key("name"));
    }
}
