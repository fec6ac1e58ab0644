use std::process::ExitCode;

use tracing::Level;

use crate::cli::args::{Cli, Commands, PartitionKindArg};
use crate::config::IngestConfig;
use crate::error::Result;
use crate::models::{list_partitions, PartitionKind};
use crate::pipelines::{Orchestrator, PipelineName};
use crate::utils::progress::ProgressReporter;

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let config = IngestConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { quiet } => {
            let orchestrator = Orchestrator::new(config)?;
            let progress = ProgressReporter::new(
                PipelineName::ORDER.len() as u64,
                "Running ingestion pipelines...",
                quiet,
            );

            let report = orchestrator.run_all(Some(&progress)).await;
            progress.println(&format!(
                "Warehouse: {}",
                orchestrator.context().warehouse.root().display()
            ));
            progress.finish_with_message("Ingestion finished");

            println!("\n{}", report.render());

            if report.succeeded() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }

        Commands::Pipeline { name } => {
            let name: PipelineName = name.parse()?;
            let orchestrator = Orchestrator::new(config)?;

            let report = orchestrator.run_pipeline(name).await;
            if report.succeeded() {
                println!(
                    "Pipeline {} completed: {} rows, {} unit(s)",
                    report.name, report.rows_loaded, report.partitions_ok
                );
                Ok(ExitCode::SUCCESS)
            } else {
                println!(
                    "Pipeline {} failed: {}",
                    report.name,
                    report.failure_cause().unwrap_or_default()
                );
                Ok(ExitCode::FAILURE)
            }
        }

        Commands::Partitions { kind } => {
            let kind = match kind {
                PartitionKindArg::Regions => PartitionKind::AvalancheRegions,
                PartitionKindArg::Grids => PartitionKind::WeatherGrids,
            };

            let partitions = list_partitions(kind);
            for partition in &partitions {
                println!(
                    "{:<12} {:<24} center ({:.4}, {:.4})",
                    partition.id,
                    partition.display_name(),
                    partition.center_lat(),
                    partition.center_lon()
                );
            }
            println!("{} partition(s)", partitions.len());

            Ok(ExitCode::SUCCESS)
        }

        Commands::Status => {
            let orchestrator = Orchestrator::new(config)?;
            let ctx = orchestrator.context();

            let tables = ctx.warehouse.list_tables()?;
            if tables.is_empty() {
                println!("Warehouse is empty: {}", ctx.warehouse.root().display());
            } else {
                println!("Warehouse tables ({}):", ctx.warehouse.root().display());
                for table in &tables {
                    if let Some(info) = ctx.warehouse.table_info(table)? {
                        println!("  {}", info.summary());
                    }
                }
            }

            let watermarks = ctx.watermarks.snapshot();
            if watermarks.is_empty() {
                println!("No watermarks recorded yet");
            } else {
                println!("Watermarks:");
                for (key, cursor) in watermarks {
                    println!("  {:<40} {}", key, cursor);
                }
            }

            Ok(ExitCode::SUCCESS)
        }
    }
}
