//! I/O operations for benchmark results.
//!
//! Results are written to a results directory:
//!
//! - `{benchmark_name}_results.csv` - one file per benchmark
//! - `benchmark_results.json` - the full nested mapping
//! - `benchmark_results.md` - human-readable tables
//!
//! Every export overwrites the files it produces; nothing is merged with
//! previous contents.

use dbcompare_core::{BenchError, ExportFormat, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::markdown;
use crate::result::BenchmarkResult;
use crate::store::ResultStore;

/// JSON file name inside the results directory.
pub const JSON_FILE: &str = "benchmark_results.json";

/// Markdown file name inside the results directory.
pub const MARKDOWN_FILE: &str = "benchmark_results.md";

/// CSV column headers, matching the [`BenchmarkResult`] fields.
pub const CSV_HEADERS: [&str; 12] = [
    "name",
    "database",
    "iterations",
    "durations",
    "min",
    "max",
    "mean",
    "median",
    "std_dev",
    "total",
    "degraded_iterations",
    "timestamp",
];

/// CSV file name for a benchmark.
pub fn csv_file_name(benchmark: &str) -> String {
    format!("{}_results.csv", benchmark.replace(['/', '\\'], "_"))
}

/// Ensure the results directory exists.
pub fn ensure_output_dir(dir: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Write one benchmark's results as CSV, one row per result.
pub fn write_results_csv(results: &[BenchmarkResult], path: impl AsRef<Path>) -> Result<()> {
    let export_err = |e: csv::Error| BenchError::Export(e.to_string());
    let mut writer = csv::Writer::from_path(path.as_ref()).map_err(export_err)?;
    writer.write_record(CSV_HEADERS).map_err(export_err)?;

    for result in results {
        let durations = serde_json::to_string(&result.durations)
            .map_err(|e| BenchError::Export(e.to_string()))?;
        writer
            .write_record([
                result.name.clone(),
                result.database.to_string(),
                result.iterations.to_string(),
                durations,
                result.min.to_string(),
                result.max.to_string(),
                result.mean.to_string(),
                result.median.to_string(),
                result.std_dev.to_string(),
                result.total.to_string(),
                result.degraded_iterations.to_string(),
                result.timestamp.to_rfc3339(),
            ])
            .map_err(export_err)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the full store as pretty-printed JSON.
pub fn write_results_json(store: &ResultStore, path: impl AsRef<Path>) -> Result<()> {
    let json =
        serde_json::to_string_pretty(store).map_err(|e| BenchError::Export(e.to_string()))?;
    fs::write(path, json)?;
    Ok(())
}

/// Write the Markdown report.
pub fn write_results_markdown(store: &ResultStore, path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, markdown::generate_report(store))?;
    Ok(())
}

/// Export `store` to `dir` in the selected `format`.
///
/// Returns the paths written.
pub fn export(
    store: &ResultStore,
    dir: impl AsRef<Path>,
    format: ExportFormat,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    ensure_output_dir(dir)?;
    let mut written = Vec::new();

    if format.includes(ExportFormat::Csv) {
        for (name, results) in store.iter() {
            let path = dir.join(csv_file_name(name));
            write_results_csv(results, &path)?;
            info!(path = %path.display(), "saved CSV results");
            written.push(path);
        }
    }

    if format.includes(ExportFormat::Json) {
        let path = dir.join(JSON_FILE);
        write_results_json(store, &path)?;
        info!(path = %path.display(), "saved JSON results");
        written.push(path);
    }

    if format.includes(ExportFormat::Markdown) {
        let path = dir.join(MARKDOWN_FILE);
        write_results_markdown(store, &path)?;
        info!(path = %path.display(), "saved Markdown results");
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbcompare_core::DatabaseKind;

    fn sample_store() -> (ResultStore, BenchmarkResult, BenchmarkResult) {
        let r1 = BenchmarkResult::from_durations("q1", DatabaseKind::Scylla, vec![0.1, 0.3, 0.2], 0)
            .unwrap();
        let r2 = BenchmarkResult::from_durations("q1", DatabaseKind::DuckDb, vec![0.05, 0.07], 1)
            .unwrap();
        let mut store = ResultStore::new();
        store.record("q1", r1.clone());
        store.record("q1", r2.clone());
        (store, r1, r2)
    }

    #[test]
    fn test_json_export_maps_name_to_ordered_results() {
        let dir = tempfile::tempdir().unwrap();
        let (store, r1, r2) = sample_store();
        let written = export(&store, dir.path(), ExportFormat::Json).unwrap();
        assert_eq!(written, vec![dir.path().join(JSON_FILE)]);

        let content = fs::read_to_string(dir.path().join(JSON_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        let q1 = value["q1"].as_array().unwrap();
        assert_eq!(q1.len(), 2);
        assert_eq!(q1[0]["database"], "scylla");
        assert_eq!(q1[1]["database"], "duckdb");

        let back: Vec<BenchmarkResult> = serde_json::from_value(value["q1"].clone()).unwrap();
        assert_eq!(back, vec![r1, r2]);
    }

    #[test]
    fn test_export_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _, _) = sample_store();

        export(&store, dir.path(), ExportFormat::All).unwrap();
        let json_first = fs::read(dir.path().join(JSON_FILE)).unwrap();
        let md_first = fs::read(dir.path().join(MARKDOWN_FILE)).unwrap();
        let csv_first = fs::read(dir.path().join(csv_file_name("q1"))).unwrap();

        export(&store, dir.path(), ExportFormat::All).unwrap();
        assert_eq!(fs::read(dir.path().join(JSON_FILE)).unwrap(), json_first);
        assert_eq!(fs::read(dir.path().join(MARKDOWN_FILE)).unwrap(), md_first);
        assert_eq!(fs::read(dir.path().join(csv_file_name("q1"))).unwrap(), csv_first);
    }

    #[test]
    fn test_export_overwrites_instead_of_merging() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _, _) = sample_store();
        export(&store, dir.path(), ExportFormat::Json).unwrap();

        let mut smaller = ResultStore::new();
        smaller.record(
            "q9",
            BenchmarkResult::from_durations("q9", DatabaseKind::Scylla, vec![1.0], 0).unwrap(),
        );
        export(&smaller, dir.path(), ExportFormat::Json).unwrap();

        let content = fs::read_to_string(dir.path().join(JSON_FILE)).unwrap();
        let back: serde_json::Value = serde_json::from_str(&content).unwrap();
        let names: Vec<&String> = back.as_object().unwrap().keys().collect();
        assert_eq!(names, vec!["q9"]);
    }

    #[test]
    fn test_csv_has_one_row_per_result() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _, _) = sample_store();
        export(&store, dir.path(), ExportFormat::Csv).unwrap();

        let mut reader = csv::Reader::from_path(dir.path().join("q1_results.csv")).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_HEADERS.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "scylla");
        assert_eq!(&rows[1][1], "duckdb");
        let durations: Vec<f64> = serde_json::from_str(&rows[0][3]).unwrap();
        assert_eq!(durations, vec![0.1, 0.3, 0.2]);
        assert_eq!(&rows[1][10], "1");
    }

    #[test]
    fn test_markdown_only_export() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _, _) = sample_store();
        let written = export(&store, dir.path(), ExportFormat::Markdown).unwrap();
        assert_eq!(written.len(), 1);
        assert!(!dir.path().join(JSON_FILE).exists());
    }
}
