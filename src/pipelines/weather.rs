use chrono::Utc;
use tracing::debug;

use crate::error::Result;
use crate::fetch::{DateWindows, FetchWindow};
use crate::models::{list_partitions, GeoPartition, PartitionKind};
use crate::normalize;
use crate::pipelines::{for_each_partition, PipelineContext, PipelineStats};
use crate::utils::constants::{
    RESOURCE_WEATHER_FORECAST, RESOURCE_WEATHER_HISTORIC, TABLE_WEATHER_FORECAST,
    TABLE_WEATHER_HISTORIC,
};
use crate::warehouse::WriteMode;

/// Primary key of both weather fact tables.
const WEATHER_PK: &[&str] = &["time", "region_id"];

/// One partition's fetch/load unit, binding the partition and its resource
/// name explicitly so nothing depends on loop-variable capture.
struct PartitionJob {
    ctx: PipelineContext,
    partition: GeoPartition,
    resource: &'static str,
}

impl PartitionJob {
    fn new(ctx: PipelineContext, partition: GeoPartition, resource: &'static str) -> Self {
        Self {
            ctx,
            partition,
            resource,
        }
    }

    fn hourly_query(&self, window: Option<FetchWindow>) -> Vec<(&'static str, String)> {
        let config = &self.ctx.config;
        let mut params = vec![
            ("latitude", format!("{:.4}", self.partition.center_lat())),
            ("longitude", format!("{:.4}", self.partition.center_lon())),
            ("hourly", config.hourly_params.join(",")),
            ("timezone", config.timezone.clone()),
        ];
        if let Some(window) = window {
            params.push(("start_date", window.start.to_string()));
            params.push(("end_date", window.end.to_string()));
        }
        params
    }

    /// Incremental archive backfill: chunk `[cursor, today]`, fetch each
    /// window, load under merge, and advance the cursor after every window so
    /// a later failure only re-fetches from the last good window.
    async fn run_historic(self) -> Result<usize> {
        let config = &self.ctx.config;
        let cursor = self.ctx.watermarks.cursor(self.resource, &self.partition.id);
        let today = Utc::now().date_naive();
        let url = format!("{}/archive", config.archive_api_base_url);

        let mut rows_loaded = 0usize;

        for window in DateWindows::new(cursor.date(), today, config.chunk_days) {
            debug!(
                partition = %self.partition.id,
                start = %window.start,
                end = %window.end,
                "fetching archive window"
            );

            let params = self.hourly_query(Some(window));
            let payload = self.ctx.client.fetch_hourly(&url, &params).await?;
            let rows = normalize::hourly_rows(&payload, &self.partition, Utc::now())?;
            if rows.is_empty() {
                continue;
            }

            let candidate = normalize::max_event_time(&rows, "time")?;
            rows_loaded += rows.len();
            self.ctx
                .warehouse
                .load(TABLE_WEATHER_HISTORIC, rows, WEATHER_PK, WriteMode::Merge)?;

            if let Some(candidate) = candidate {
                self.ctx.watermarks.advance(
                    self.resource,
                    &self.partition.id,
                    candidate,
                    Utc::now().naive_utc(),
                )?;
            }
        }

        Ok(rows_loaded)
    }

    /// Forecast fetch: the endpoint serves a fixed horizon with no date
    /// parameters, so every run re-fetches it and relies on merge semantics.
    /// The cursor is still advanced (capped at the present) for visibility.
    async fn run_forecast(self) -> Result<usize> {
        let url = format!("{}/forecast", self.ctx.config.forecast_api_base_url);
        let params = self.hourly_query(None);

        let payload = self.ctx.client.fetch_hourly(&url, &params).await?;
        let rows = normalize::hourly_rows(&payload, &self.partition, Utc::now())?;
        if rows.is_empty() {
            return Ok(0);
        }

        let candidate = normalize::max_event_time(&rows, "time")?;
        let rows_loaded = rows.len();
        self.ctx
            .warehouse
            .load(TABLE_WEATHER_FORECAST, rows, WEATHER_PK, WriteMode::Merge)?;

        if let Some(candidate) = candidate {
            self.ctx.watermarks.advance(
                self.resource,
                &self.partition.id,
                candidate,
                Utc::now().naive_utc(),
            )?;
        }

        Ok(rows_loaded)
    }
}

pub async fn run_historic(ctx: &PipelineContext) -> Result<PipelineStats> {
    let partitions = list_partitions(PartitionKind::AvalancheRegions);
    let max_workers = ctx.config.max_workers;
    let ctx = ctx.clone();

    Ok(for_each_partition(partitions, max_workers, move |partition| {
        PartitionJob::new(ctx.clone(), partition, RESOURCE_WEATHER_HISTORIC).run_historic()
    })
    .await)
}

pub async fn run_forecast(ctx: &PipelineContext) -> Result<PipelineStats> {
    let partitions = list_partitions(PartitionKind::AvalancheRegions);
    let max_workers = ctx.config.max_workers;
    let ctx = ctx.clone();

    Ok(for_each_partition(partitions, max_workers, move |partition| {
        PartitionJob::new(ctx.clone(), partition, RESOURCE_WEATHER_FORECAST).run_forecast()
    })
    .await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;
    use crate::models::BoundingBox;
    use chrono::NaiveDate;

    fn job(resource: &'static str) -> PartitionJob {
        let dir = tempfile::tempdir().unwrap().into_path();
        let config = IngestConfig {
            warehouse_dir: dir,
            ..Default::default()
        };
        let ctx = PipelineContext::from_config(config).unwrap();
        let partition = GeoPartition::new(
            "3010",
            Some("Lyngen".to_string()),
            BoundingBox::new(69.9, 19.5, 69.4, 21.0),
        );
        PartitionJob::new(ctx, partition, resource)
    }

    #[tokio::test]
    async fn test_historic_query_includes_window() {
        let job = job(RESOURCE_WEATHER_HISTORIC);
        let window = FetchWindow {
            start: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
        };

        let params = job.hourly_query(Some(window));
        let find = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
        };

        assert_eq!(find("latitude").unwrap(), "69.6500");
        assert_eq!(find("longitude").unwrap(), "20.2500");
        assert_eq!(find("start_date").unwrap(), "2026-01-10");
        assert_eq!(find("end_date").unwrap(), "2026-01-12");
        assert_eq!(
            find("hourly").unwrap(),
            "temperature_2m,relative_humidity_2m,precipitation,windspeed_10m"
        );
        assert_eq!(find("timezone").unwrap(), "Europe/Oslo");
    }

    #[tokio::test]
    async fn test_forecast_query_has_no_date_range() {
        let job = job(RESOURCE_WEATHER_FORECAST);
        let params = job.hourly_query(None);
        assert!(!params.iter().any(|(k, _)| *k == "start_date"));
        assert!(!params.iter().any(|(k, _)| *k == "end_date"));
    }
}
