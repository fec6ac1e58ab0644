use chrono::{Days, Utc};
use tracing::info;

use crate::error::Result;
use crate::models::{list_partitions, GeoPartition, PartitionKind};
use crate::normalize;
use crate::pipelines::{for_each_partition, PipelineContext, PipelineStats};
use crate::utils::constants::{RESOURCE_AVALANCHE_WARNINGS, TABLE_AVALANCHE_WARNINGS};
use crate::warehouse::WriteMode;

/// Primary key of the danger-level table: a warning is identified by its
/// registration id and validity window.
const WARNING_PK: &[&str] = &["RegId", "ValidFrom", "ValidTo"];

/// Ingest avalanche warnings per region. The fetch window runs from the
/// region's cursor to `warning_horizon_days` past today, because warnings
/// state a forward validity period. The cursor tracks publish time, which is
/// never legitimately future-dated, so the cap-at-present rule cannot force
/// refetch loops while future `ValidTo` values stay in the data.
pub async fn run(ctx: &PipelineContext) -> Result<PipelineStats> {
    let partitions = list_partitions(PartitionKind::AvalancheRegions);
    let max_workers = ctx.config.max_workers;
    let ctx = ctx.clone();

    Ok(for_each_partition(partitions, max_workers, move |partition| {
        let ctx = ctx.clone();
        async move { fetch_region_warnings(&ctx, partition).await }
    })
    .await)
}

async fn fetch_region_warnings(ctx: &PipelineContext, partition: GeoPartition) -> Result<usize> {
    let config = &ctx.config;
    let cursor = ctx
        .watermarks
        .cursor(RESOURCE_AVALANCHE_WARNINGS, &partition.id);
    let start = cursor.date();
    let end = Utc::now()
        .date_naive()
        .checked_add_days(Days::new(u64::from(config.warning_horizon_days)))
        .unwrap_or_else(|| Utc::now().date_naive());

    let url = warning_url(
        &config.avalanche_api_base_url,
        &partition.id,
        &config.language_key,
        &start.to_string(),
        &end.to_string(),
    );

    let items = ctx.client.fetch_list(&url).await?;
    let rows = normalize::warning_rows(&items, &partition, Utc::now())?;
    if rows.is_empty() {
        return Ok(0);
    }

    let candidate = normalize::max_event_time(&rows, "PublishTime")?;
    let rows_loaded = rows.len();
    ctx.warehouse
        .load(TABLE_AVALANCHE_WARNINGS, rows, WARNING_PK, WriteMode::Merge)?;

    if let Some(candidate) = candidate {
        ctx.watermarks.advance(
            RESOURCE_AVALANCHE_WARNINGS,
            &partition.id,
            candidate,
            Utc::now().naive_utc(),
        )?;
    }

    info!(
        region = %partition.id,
        warnings = rows_loaded,
        "processed avalanche warnings"
    );

    Ok(rows_loaded)
}

fn warning_url(base: &str, region_id: &str, language_key: &str, start: &str, end: &str) -> String {
    format!(
        "{}/AvalancheWarningByRegion/Simple/{}/{}/{}/{}",
        base, region_id, language_key, start, end
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_url_layout() {
        let url = warning_url(
            "https://api01.nve.no/hydrology/forecast/avalanche/v6.3.0/api",
            "3010",
            "1",
            "2026-01-10",
            "2026-01-19",
        );
        assert_eq!(
            url,
            "https://api01.nve.no/hydrology/forecast/avalanche/v6.3.0/api\
             /AvalancheWarningByRegion/Simple/3010/1/2026-01-10/2026-01-19"
        );
    }
}
