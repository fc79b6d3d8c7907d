//! `status` command: the effective configuration, human-readable.

use colored::Colorize;
use dbcompare_core::{BenchConfig, DatabaseKind};
use std::fmt::Write;

/// Render the configuration summary.
pub fn render_status(config: &BenchConfig, detailed: bool) -> String {
    let mut out = String::new();
    let bench = &config.benchmarks;
    let scylla = &config.databases.scylla;
    let duckdb = &config.databases.duckdb;

    writeln!(out, "{}", "dbcompare benchmark harness".bold().green()).unwrap();
    writeln!(out, "Version: {}", env!("CARGO_PKG_VERSION")).unwrap();

    writeln!(out, "\n{}", "Benchmarks".bold()).unwrap();
    writeln!(out, "  iterations:            {}", bench.iterations).unwrap();
    writeln!(out, "  warmup iterations:     {}", bench.warmup_iterations).unwrap();
    writeln!(out, "  concurrency levels:    {:?}", bench.concurrency).unwrap();
    writeln!(out, "  operations per worker: {}", bench.operations_per_worker).unwrap();
    writeln!(out, "  degraded iterations:   {:?}", bench.degraded_iterations).unwrap();

    writeln!(out, "\n{}", "Datasets".bold()).unwrap();
    for (name, size) in &config.data.sizes {
        let state = if size.file_path.exists() {
            "present".green()
        } else {
            "missing".yellow()
        };
        writeln!(
            out,
            "  {:<8} {:>10} rows  {} ({})",
            name,
            size.rows,
            size.file_path.display(),
            state
        )
        .unwrap();
    }

    writeln!(out, "\n{}", "Databases".bold()).unwrap();
    writeln!(
        out,
        "  {}: {} port {} keyspace {} ({:?})",
        DatabaseKind::Scylla,
        scylla.hosts.join(", "),
        scylla.port,
        scylla.keyspace,
        scylla.failure_policy
    )
    .unwrap();
    writeln!(
        out,
        "  {}: {} memory {} threads {} ({:?})",
        DatabaseKind::DuckDb,
        duckdb.database_path,
        duckdb.memory_limit,
        duckdb.threads,
        duckdb.failure_policy
    )
    .unwrap();

    writeln!(out, "\n{}", "Output".bold()).unwrap();
    writeln!(out, "  results dir: {}", config.output.results_dir.display()).unwrap();
    writeln!(out, "  format:      {:?}", config.output.format).unwrap();

    if detailed {
        writeln!(out, "\n{}", "Columns".bold()).unwrap();
        for column in &config.data.columns {
            writeln!(out, "  {:<10} {}", column.name, column.column_type).unwrap();
        }
    }

    out
}

/// Print the configuration summary to stdout.
pub fn print_status(config: &BenchConfig, detailed: bool) {
    print!("{}", render_status(config, detailed));
}
