use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "boreas-ingest")]
#[command(about = "Incremental weather and avalanche warning ingestion")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every ingestion pipeline in order
    Run {
        #[arg(long, default_value = "false", help = "Suppress progress output")]
        quiet: bool,
    },

    /// Run a single named pipeline
    Pipeline {
        #[arg(
            help = "Pipeline name: reference_data, weather_historic, weather_forecast or avalanche_warnings"
        )]
        name: String,
    },

    /// List the partitions of a registry kind
    Partitions {
        #[arg(value_enum, default_value = "regions")]
        kind: PartitionKindArg,
    },

    /// Show warehouse table statistics and watermark state
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PartitionKindArg {
    Regions,
    Grids,
}
