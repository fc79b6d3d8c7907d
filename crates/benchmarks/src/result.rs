//! Benchmark result types.
//!
//! A [`BenchmarkResult`] is produced once per completed (benchmark, database)
//! trial and is never mutated afterwards.

use chrono::{DateTime, Utc};
use dbcompare_core::{DatabaseKind, Result};
use serde::{Deserialize, Serialize};

use crate::stats::summarize;

/// Timing statistics of one trial against one database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Benchmark name, e.g. `point_query_small`.
    pub name: String,
    /// Engine the trial ran against.
    pub database: DatabaseKind,
    /// Number of durations the statistics cover.
    pub iterations: usize,
    /// Per-iteration wall-clock durations in seconds, in call order.
    pub durations: Vec<f64>,
    /// Smallest duration
    pub min: f64,
    /// Largest duration
    pub max: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Median duration
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Sum of all durations
    pub total: f64,
    /// Measured iterations that completed with tolerated failures.
    #[serde(default)]
    pub degraded_iterations: usize,
    /// Time the trial finished.
    pub timestamp: DateTime<Utc>,
}

impl BenchmarkResult {
    /// Build a result from collected durations.
    ///
    /// # Errors
    ///
    /// Fails with a statistics error when `durations` is empty or invalid.
    pub fn from_durations(
        name: impl Into<String>,
        database: DatabaseKind,
        durations: Vec<f64>,
        degraded_iterations: usize,
    ) -> Result<Self> {
        let summary = summarize(&durations)?;
        Ok(Self {
            name: name.into(),
            database,
            iterations: durations.len(),
            durations,
            min: summary.min,
            max: summary.max,
            mean: summary.mean,
            median: summary.median,
            std_dev: summary.std_dev,
            total: summary.total,
            degraded_iterations,
            timestamp: Utc::now(),
        })
    }
}
