// Copyright 2025 DB Compare Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark configuration.
//!
//! Configuration is read from a YAML file and may be overridden through
//! environment variables prefixed with `DBCOMPARE__`, using `__` as the
//! nesting separator (for example `DBCOMPARE__BENCHMARKS__ITERATIONS=10`).
//! Every loaded configuration is validated before it is handed out, so a
//! malformed file fails at startup rather than in the middle of a run.

use serde::de::{self, IntoDeserializer, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::database::DatabaseKind;
use crate::error::{BenchError, Result};
use crate::schema::{default_columns, ColumnSpec};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/benchmark_config.yaml";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "DBCOMPARE";

/// How per-worker or per-operation failures are treated during a fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Any failure aborts the trial.
    Strict,
    /// Failures are logged and counted; the trial continues.
    Lenient,
}

/// Whether iterations with tolerated failures count toward statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegradedIterations {
    /// Keep degraded iterations in the statistics.
    #[default]
    Include,
    /// Drop degraded iterations from the statistics; they are only counted.
    Exclude,
}

/// Result export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Markdown,
    #[default]
    All,
}

impl ExportFormat {
    /// Whether this selection includes `other`.
    pub fn includes(&self, other: ExportFormat) -> bool {
        *self == ExportFormat::All || *self == other
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            "all" => Ok(Self::All),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    pub benchmarks: BenchmarksConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub databases: DatabasesConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Loop bounds and workload sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarksConfig {
    /// Measured iterations per trial.
    pub iterations: usize,
    /// Untimed iterations before measurement.
    #[serde(default)]
    pub warmup_iterations: usize,
    /// Worker counts for the concurrent suite, run in order.
    #[serde(deserialize_with = "one_or_many")]
    pub concurrency: Vec<usize>,
    #[serde(default = "default_operations_per_worker")]
    pub operations_per_worker: usize,
    #[serde(default = "default_point_queries")]
    pub point_queries: usize,
    #[serde(default = "default_range_queries")]
    pub range_queries: usize,
    #[serde(default = "default_aggregation_queries")]
    pub aggregation_queries: usize,
    /// How many ids or categories are sampled before randomized lookups.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default)]
    pub degraded_iterations: DegradedIterations,
    /// Seed for dataset generation and workload randomness.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Accept a single value where a list is expected.
///
/// Environment overrides parse `8` as an integer rather than a one-element list.
fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct OneOrMany<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for OneOrMany<T> {
        type Value = Vec<T>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a value or a list of values")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Vec<T>, E> {
            T::deserialize(v.into_deserializer()).map(|value| vec![value])
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Vec<T>, E> {
            T::deserialize(v.into_deserializer()).map(|value| vec![value])
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Vec<T>, E> {
            T::deserialize(v.into_deserializer()).map(|value| vec![value])
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Vec<T>, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(value) = seq.next_element()? {
                values.push(value);
            }
            Ok(values)
        }
    }

    deserializer.deserialize_any(OneOrMany(PhantomData))
}

fn default_operations_per_worker() -> usize {
    10
}

fn default_point_queries() -> usize {
    100
}

fn default_range_queries() -> usize {
    10
}

fn default_aggregation_queries() -> usize {
    10
}

fn default_sample_size() -> usize {
    1000
}

/// Dataset sizes and the column schema shared by all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Named sizes such as `small`, `medium`, `large`.
    pub sizes: BTreeMap<String, DatasetSize>,
    /// Generator bounds per column. Names and types must follow the table layout.
    #[serde(default = "default_columns")]
    pub columns: Vec<ColumnSpec>,
}

impl DataConfig {
    /// Look up a dataset size by name.
    pub fn size(&self, name: &str) -> Result<&DatasetSize> {
        self.sizes
            .get(name)
            .ok_or_else(|| BenchError::Configuration(format!("unknown dataset size: {name}")))
    }
}

/// Row count and on-disk location of one dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSize {
    pub rows: u64,
    pub file_path: PathBuf,
}

/// Connection settings for both engines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabasesConfig {
    #[serde(default)]
    pub scylla: ScyllaConfig,
    #[serde(default)]
    pub duckdb: DuckDbConfig,
}

impl DatabasesConfig {
    /// The fan-out failure policy configured for `kind`.
    pub fn failure_policy(&self, kind: DatabaseKind) -> FailurePolicy {
        match kind {
            DatabaseKind::Scylla => self.scylla.failure_policy,
            DatabaseKind::DuckDb => self.duckdb.failure_policy,
        }
    }
}

/// ScyllaDB connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScyllaConfig {
    /// Contact points tried in order until one accepts a session.
    #[serde(deserialize_with = "one_or_many")]
    pub hosts: Vec<String>,
    pub port: u16,
    pub keyspace: String,
    pub replication_factor: u32,
    pub username: Option<String>,
    pub password: Option<String>,
    pub failure_policy: FailurePolicy,
}

impl Default for ScyllaConfig {
    fn default() -> Self {
        Self {
            hosts: vec![
                "scylla".to_string(),
                "scylla-node".to_string(),
                "127.0.0.1".to_string(),
            ],
            port: 9042,
            keyspace: "benchmark".to_string(),
            replication_factor: 1,
            username: None,
            password: None,
            failure_policy: FailurePolicy::Strict,
        }
    }
}

/// DuckDB settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuckDbConfig {
    /// Database file, or `:memory:` for an in-process database.
    pub database_path: String,
    pub memory_limit: String,
    pub threads: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for DuckDbConfig {
    fn default() -> Self {
        Self {
            database_path: "data/duckdb/benchmark.duckdb".to_string(),
            memory_limit: "4GB".to_string(),
            threads: 4,
            failure_policy: FailurePolicy::Lenient,
        }
    }
}

/// Where and how results are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub results_dir: PathBuf,
    pub format: ExportFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            format: ExportFormat::All,
        }
    }
}

/// Log level filter and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl BenchConfig {
    /// Load configuration from `path` plus environment overrides, then validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("benchmarks.concurrency")
                    .with_list_parse_key("databases.scylla.hosts"),
            )
            .build()
            .map_err(|e| {
                BenchError::Configuration(format!("failed to read {}: {}", path.display(), e))
            })?;

        let parsed: BenchConfig = config
            .try_deserialize()
            .map_err(|e| BenchError::Configuration(format!("{}: {}", path.display(), e)))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Parse configuration from a YAML string without environment overrides.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let parsed: BenchConfig = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| BenchError::Configuration(e.to_string()))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Check the invariants every trial relies on.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(BenchError::Configuration(msg));

        if self.benchmarks.iterations == 0 {
            return invalid("benchmarks.iterations must be at least 1".into());
        }
        if self.benchmarks.concurrency.is_empty() {
            return invalid("benchmarks.concurrency must list at least one level".into());
        }
        if self.benchmarks.concurrency.contains(&0) {
            return invalid("benchmarks.concurrency levels must be at least 1".into());
        }
        if self.benchmarks.operations_per_worker == 0 {
            return invalid("benchmarks.operations_per_worker must be at least 1".into());
        }
        if self.benchmarks.sample_size == 0 {
            return invalid("benchmarks.sample_size must be at least 1".into());
        }
        if self.data.sizes.is_empty() {
            return invalid("data.sizes must define at least one dataset".into());
        }
        for (name, size) in &self.data.sizes {
            if size.rows == 0 {
                return invalid(format!("data.sizes.{name}.rows must be at least 1"));
            }
        }
        if self.data.columns.is_empty() {
            return invalid("data.columns must define at least one column".into());
        }
        for column in &self.data.columns {
            column.validate().or_else(|e| invalid(format!("data.columns: {e}")))?;
        }
        let layout = default_columns();
        let matches_layout = self.data.columns.len() == layout.len()
            && self
                .data
                .columns
                .iter()
                .zip(&layout)
                .all(|(c, l)| c.name == l.name && c.column_type == l.column_type);
        if !matches_layout {
            let expected: Vec<String> = layout
                .iter()
                .map(|c| format!("{}: {}", c.name, c.column_type))
                .collect();
            return invalid(format!(
                "data.columns must match the benchmark table layout [{}]",
                expected.join(", ")
            ));
        }
        if self.databases.scylla.hosts.is_empty() {
            return invalid("databases.scylla.hosts must list at least one host".into());
        }
        if self.databases.duckdb.threads == 0 {
            return invalid("databases.duckdb.threads must be at least 1".into());
        }
        Ok(())
    }
}
