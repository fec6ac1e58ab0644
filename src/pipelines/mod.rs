pub mod avalanche;
pub mod reference;
pub mod weather;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::fetch::FetchClient;
use crate::models::GeoPartition;
use crate::state::WatermarkStore;
use crate::utils::constants::WATERMARKS_FILE;
use crate::utils::progress::ProgressReporter;
use crate::warehouse::Warehouse;

/// The fixed set of named ingestion pipelines, in execution order.
/// Reference data runs first because the fact tables reference its ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineName {
    ReferenceData,
    WeatherHistoric,
    WeatherForecast,
    AvalancheWarnings,
}

impl PipelineName {
    pub const ORDER: [PipelineName; 4] = [
        PipelineName::ReferenceData,
        PipelineName::WeatherHistoric,
        PipelineName::WeatherForecast,
        PipelineName::AvalancheWarnings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineName::ReferenceData => "reference_data",
            PipelineName::WeatherHistoric => "weather_historic",
            PipelineName::WeatherForecast => "weather_forecast",
            PipelineName::AvalancheWarnings => "avalanche_warnings",
        }
    }
}

impl fmt::Display for PipelineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineName {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reference_data" => Ok(PipelineName::ReferenceData),
            "weather_historic" => Ok(PipelineName::WeatherHistoric),
            "weather_forecast" => Ok(PipelineName::WeatherForecast),
            "avalanche_warnings" => Ok(PipelineName::AvalancheWarnings),
            other => Err(IngestError::Config(format!(
                "unknown pipeline '{}' (expected one of: reference_data, weather_historic, \
                 weather_forecast, avalanche_warnings)",
                other
            ))),
        }
    }
}

/// A partition whose fetch/normalize/load cycle failed this run. Its
/// watermark was left for the next run to retry the same window.
#[derive(Debug)]
pub struct PartitionFailure {
    pub partition_id: String,
    pub error: IngestError,
}

/// Counters accumulated while a pipeline runs its units of work.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub rows_loaded: usize,
    pub partitions_ok: usize,
    pub failures: Vec<PartitionFailure>,
}

/// Outcome of one named pipeline.
#[derive(Debug)]
pub struct PipelineReport {
    pub name: PipelineName,
    pub rows_loaded: usize,
    pub partitions_ok: usize,
    pub failures: Vec<PartitionFailure>,
    /// Pipeline-scope failure outside any single partition
    pub fatal: Option<IngestError>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.fatal.is_none() && self.failures.is_empty()
    }

    /// One-line cause description for the aggregate report.
    pub fn failure_cause(&self) -> Option<String> {
        if let Some(fatal) = &self.fatal {
            return Some(fatal.to_string());
        }
        if self.failures.is_empty() {
            return None;
        }
        let ids: Vec<&str> = self
            .failures
            .iter()
            .map(|f| f.partition_id.as_str())
            .collect();
        Some(format!(
            "{} partition(s) failed [{}]; first error: {}",
            self.failures.len(),
            ids.join(", "),
            self.failures[0].error
        ))
    }
}

/// Aggregate outcome of an orchestrator run.
#[derive(Debug)]
pub struct RunReport {
    pub pipelines: Vec<PipelineReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.pipelines.iter().all(PipelineReport::succeeded)
    }

    pub fn failed_pipelines(&self) -> Vec<&PipelineReport> {
        self.pipelines.iter().filter(|p| !p.succeeded()).collect()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for report in &self.pipelines {
            if report.succeeded() {
                out.push_str(&format!(
                    "  ok     {:<20} {} rows, {} unit(s)\n",
                    report.name, report.rows_loaded, report.partitions_ok
                ));
            } else {
                out.push_str(&format!(
                    "  FAILED {:<20} {}\n",
                    report.name,
                    report.failure_cause().unwrap_or_default()
                ));
            }
        }

        let failed = self.failed_pipelines();
        if failed.is_empty() {
            out.push_str("All pipelines completed successfully\n");
        } else {
            let names: Vec<&str> = failed.iter().map(|p| p.name.as_str()).collect();
            out.push_str(&format!(
                "{} of {} pipeline(s) failed: {}\n",
                failed.len(),
                self.pipelines.len(),
                names.join(", ")
            ));
        }
        out
    }
}

/// Shared handles every pipeline works against. All components are stateless
/// per invocation except the watermark store, which owns cursor state, and
/// the warehouse, which serializes writes internally.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: Arc<IngestConfig>,
    pub client: FetchClient,
    pub warehouse: Arc<Warehouse>,
    pub watermarks: Arc<WatermarkStore>,
}

impl PipelineContext {
    pub fn from_config(config: IngestConfig) -> Result<Self> {
        let client = FetchClient::new(Duration::from_secs(config.request_timeout_secs))?;
        let warehouse = Arc::new(Warehouse::open(&config.warehouse_dir)?);
        let watermarks = Arc::new(WatermarkStore::open(
            &config.warehouse_dir.join(WATERMARKS_FILE),
            config.start_watermark(),
        )?);

        Ok(Self {
            config: Arc::new(config),
            client,
            warehouse,
            watermarks,
        })
    }
}

/// Runs the fixed ordered pipeline list, isolating failures per pipeline and
/// aggregating the final status.
pub struct Orchestrator {
    ctx: PipelineContext,
}

impl Orchestrator {
    pub fn new(config: IngestConfig) -> Result<Self> {
        Ok(Self {
            ctx: PipelineContext::from_config(config)?,
        })
    }

    pub fn with_context(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Run every named pipeline in order. A pipeline failure is recorded and
    /// the remaining pipelines still run.
    pub async fn run_all(&self, progress: Option<&ProgressReporter>) -> RunReport {
        let mut reports = Vec::with_capacity(PipelineName::ORDER.len());

        for (i, name) in PipelineName::ORDER.into_iter().enumerate() {
            if let Some(p) = progress {
                p.update(i as u64);
                p.set_message(&format!("Running {} pipeline...", name));
            }
            reports.push(self.run_pipeline(name).await);
        }

        if let Some(p) = progress {
            p.update(PipelineName::ORDER.len() as u64);
        }

        RunReport { pipelines: reports }
    }

    pub async fn run_pipeline(&self, name: PipelineName) -> PipelineReport {
        info!(pipeline = %name, "starting");

        let outcome = match name {
            PipelineName::ReferenceData => reference::run(&self.ctx).await,
            PipelineName::WeatherHistoric => weather::run_historic(&self.ctx).await,
            PipelineName::WeatherForecast => weather::run_forecast(&self.ctx).await,
            PipelineName::AvalancheWarnings => avalanche::run(&self.ctx).await,
        };

        match outcome {
            Ok(stats) => {
                if stats.failures.is_empty() {
                    info!(
                        pipeline = %name,
                        rows = stats.rows_loaded,
                        units = stats.partitions_ok,
                        "completed"
                    );
                } else {
                    error!(
                        pipeline = %name,
                        failed = stats.failures.len(),
                        ok = stats.partitions_ok,
                        "completed with partition failures"
                    );
                }
                PipelineReport {
                    name,
                    rows_loaded: stats.rows_loaded,
                    partitions_ok: stats.partitions_ok,
                    failures: stats.failures,
                    fatal: None,
                }
            }
            Err(e) => {
                error!(pipeline = %name, error = %e, "pipeline failed");
                PipelineReport {
                    name,
                    rows_loaded: 0,
                    partitions_ok: 0,
                    failures: Vec::new(),
                    fatal: Some(e),
                }
            }
        }
    }
}

/// Fan a per-partition job across a bounded set of tasks.
///
/// Each partition's fetch/normalize/load/advance sequence runs inside its own
/// task, so two windows for the same partition never interleave, and a failed
/// partition never cancels its siblings. The job takes the partition as an
/// explicit parameter; nothing is captured by late binding.
pub(crate) async fn for_each_partition<F, Fut>(
    partitions: Vec<GeoPartition>,
    max_workers: usize,
    job: F,
) -> PipelineStats
where
    F: Fn(GeoPartition) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<usize>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut tasks = JoinSet::new();

    for partition in partitions {
        let semaphore = Arc::clone(&semaphore);
        let job = job.clone();
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("semaphore closed while tasks pending");
            let partition_id = partition.id.clone();
            (partition_id, job(partition).await)
        });
    }

    let mut stats = PipelineStats::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(rows))) => {
                stats.partitions_ok += 1;
                stats.rows_loaded += rows;
            }
            Ok((partition_id, Err(e))) => {
                error!(partition = %partition_id, error = %e, "partition failed; watermark unchanged");
                stats.failures.push(PartitionFailure {
                    partition_id,
                    error: e,
                });
            }
            Err(join_error) => {
                stats.failures.push(PartitionFailure {
                    partition_id: "<task>".to_string(),
                    error: join_error.into(),
                });
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, GeoPartition};

    fn partition(id: &str) -> GeoPartition {
        GeoPartition::new(id, None, BoundingBox::new(61.0, 6.0, 60.0, 8.0))
    }

    #[test]
    fn test_pipeline_name_round_trip() {
        for name in PipelineName::ORDER {
            assert_eq!(name.as_str().parse::<PipelineName>().unwrap(), name);
        }
        assert!("weather".parse::<PipelineName>().is_err());
    }

    #[test]
    fn test_reference_data_runs_first() {
        assert_eq!(PipelineName::ORDER[0], PipelineName::ReferenceData);
    }

    #[tokio::test]
    async fn test_fan_out_isolates_failures() {
        let partitions = vec![partition("1"), partition("2"), partition("3")];

        let stats = for_each_partition(partitions, 2, |p| async move {
            if p.id == "2" {
                Err(IngestError::Network("connection reset".to_string()))
            } else {
                Ok(10)
            }
        })
        .await;

        assert_eq!(stats.partitions_ok, 2);
        assert_eq!(stats.rows_loaded, 20);
        assert_eq!(stats.failures.len(), 1);
        assert_eq!(stats.failures[0].partition_id, "2");
    }

    #[test]
    fn test_run_report_rendering() {
        let report = RunReport {
            pipelines: vec![
                PipelineReport {
                    name: PipelineName::ReferenceData,
                    rows_loaded: 100,
                    partitions_ok: 2,
                    failures: Vec::new(),
                    fatal: None,
                },
                PipelineReport {
                    name: PipelineName::WeatherHistoric,
                    rows_loaded: 0,
                    partitions_ok: 0,
                    failures: Vec::new(),
                    fatal: Some(IngestError::Network("dns failure".to_string())),
                },
            ],
        };

        assert!(!report.succeeded());
        let rendered = report.render();
        assert!(rendered.contains("weather_historic"));
        assert!(rendered.contains("dns failure"));
        assert!(rendered.contains("1 of 2 pipeline(s) failed"));
    }
}
