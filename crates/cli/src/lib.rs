//! CLI for dbcompare.
//!
//! This crate provides the `dbcompare` command-line interface: the `run`
//! subcommand that drives the benchmark suites, `generate` for datasets and
//! `status` for the effective configuration.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod generate;
pub mod runner;
pub mod status;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dbcompare_adapters::{all_connectors, Connector};
use dbcompare_core::config::{DatabasesConfig, DEFAULT_CONFIG_PATH};
use dbcompare_core::{BenchConfig, DatabaseKind, ExportFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument::WithSubscriber;
use tracing::{error, info};

use crate::runner::Harness;

/// ScyllaDB vs DuckDB benchmark harness.
#[derive(Parser, Debug)]
#[command(name = "dbcompare")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file.
    #[arg(
        short,
        long,
        global = true,
        env = "DBCOMPARE_CONFIG",
        default_value = DEFAULT_CONFIG_PATH
    )]
    pub config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Benchmark suites selectable with `run --benchmarks`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    /// Bulk dataset loading.
    DataLoading,
    /// Point, range and aggregation queries.
    Queries,
    /// Mixed read/insert/update workers at every concurrency level.
    Concurrent,
    /// Every suite.
    All,
}

/// Query workloads selectable with `run --queries`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Lookups by primary key.
    Point,
    /// Scans over `user_id` windows.
    Range,
    /// Grouped aggregates per category.
    Aggregation,
    /// Every query workload.
    All,
}

/// Whether `selected` includes `wanted`, treating `all` as everything.
pub fn selects<T: PartialEq + Copy>(selected: &[T], wanted: T, all: T) -> bool {
    selected.iter().any(|s| *s == wanted || *s == all)
}

/// Connectors for the engines in `databases`, in suite order.
pub fn select_connectors(
    config: &DatabasesConfig,
    databases: &[DatabaseKind],
) -> Vec<Arc<dyn Connector>> {
    all_connectors(config)
        .into_iter()
        .filter(|connector| databases.contains(&connector.kind()))
        .collect()
}

/// Load variables from a `.env` file, the nearest one when `path` is `None`.
///
/// A missing file is fine; an unreadable or malformed one is an error.
pub fn load_env_file(path: Option<&Path>) -> anyhow::Result<()> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    match loaded {
        Err(e) if !e.not_found() => Err(e).context("loading .env"),
        _ => Ok(()),
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the benchmark suites and export results after every suite.
    ///
    /// Results are written to the results directory:
    /// - {benchmark}_results.csv - one file per benchmark
    /// - benchmark_results.json - all results
    /// - benchmark_results.md - comparison tables
    Run {
        /// Dataset sizes to benchmark, as named in the configuration.
        #[arg(short = 's', long, value_delimiter = ',', default_value = "small")]
        data_sizes: Vec<String>,

        /// Suites to run.
        #[arg(short, long, value_enum, value_delimiter = ',', default_value = "all")]
        benchmarks: Vec<Suite>,

        /// Query workloads of the `queries` suite.
        #[arg(short, long, value_enum, value_delimiter = ',', default_value = "all")]
        queries: Vec<QueryKind>,

        /// Engines to benchmark.
        #[arg(short, long, value_delimiter = ',', default_value = "scylla,duckdb")]
        databases: Vec<DatabaseKind>,

        /// Reuse existing dataset files instead of regenerating them.
        #[arg(long)]
        skip_data_generation: bool,

        /// Export format override: csv, json, markdown or all.
        #[arg(short, long)]
        format: Option<ExportFormat>,

        /// Results directory override.
        #[arg(short, long)]
        results_dir: Option<PathBuf>,
    },

    /// Generate datasets without benchmarking.
    Generate {
        /// Dataset sizes to generate.
        #[arg(short = 's', long, value_delimiter = ',', default_value = "small")]
        data_sizes: Vec<String>,
    },

    /// Show the effective configuration.
    Status {
        /// Also list the column schema.
        #[arg(long)]
        detailed: bool,
    },
}

/// Load the configuration, build the logging dispatcher and run the command
/// under it.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    let mut config = BenchConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    let dispatch = dbcompare_core::logging::build_dispatch(&config.logging)?;

    run_command(cli.command, config).with_subscriber(dispatch).await
}

/// Run one command against a loaded configuration.
pub async fn run_command(command: Commands, mut config: BenchConfig) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            data_sizes,
            benchmarks,
            queries,
            databases,
            skip_data_generation,
            format,
            results_dir,
        } => {
            if let Some(format) = format {
                config.output.format = format;
            }
            if let Some(dir) = results_dir {
                config.output.results_dir = dir;
            }
            for size in &data_sizes {
                config.data.size(size)?;
            }

            let connectors = select_connectors(&config.databases, &databases);

            let mut harness = Harness::new(config, connectors);
            for size in &data_sizes {
                if !skip_data_generation {
                    generate::generate_size(harness.config(), size)?;
                }
                if let Err(e) = harness.run_size(size, &benchmarks, &queries).await {
                    error!(error = %e, "benchmark run aborted");
                    return Err(e.into());
                }
            }

            info!(
                benchmarks = harness.store().len(),
                results_dir = %harness.config().output.results_dir.display(),
                "all benchmarks completed"
            );
            println!(
                "Completed {} benchmarks; results in {}",
                harness.store().len(),
                harness.config().output.results_dir.display()
            );
            Ok(())
        }
        Commands::Generate { data_sizes } => {
            for size in &data_sizes {
                generate::generate_size(&config, size)?;
            }
            Ok(())
        }
        Commands::Status { detailed } => {
            status::print_status(&config, detailed);
            Ok(())
        }
    }
}
