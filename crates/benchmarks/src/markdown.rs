//! Markdown output generation for benchmark results.
//!
//! The report holds one table per benchmark name comparing the databases.
//! It carries no generation time, so identical stores render identically.

use std::fmt::Write;

use crate::result::BenchmarkResult;
use crate::store::ResultStore;

/// Generate the Markdown report for every benchmark in `store`.
pub fn generate_report(store: &ResultStore) -> String {
    let mut output = String::new();

    output.push_str("# Database Benchmark Results\n\n");

    for (name, results) in store.iter() {
        output.push_str(&benchmark_table(name, results));
        output.push('\n');
    }

    output
}

/// Render the comparison table of one benchmark.
pub fn benchmark_table(name: &str, results: &[BenchmarkResult]) -> String {
    let mut output = String::new();

    writeln!(output, "## {name}").unwrap();
    writeln!(output).unwrap();
    writeln!(
        output,
        "| Database | Min (s) | Max (s) | Mean (s) | Median (s) | Std Dev |"
    )
    .unwrap();
    writeln!(
        output,
        "|----------|---------|---------|----------|------------|---------|"
    )
    .unwrap();

    for result in results {
        writeln!(
            output,
            "| {} | {:.4} | {:.4} | {:.4} | {:.4} | {:.4} |",
            result.database, result.min, result.max, result.mean, result.median, result.std_dev
        )
        .unwrap();
    }

    output
}
