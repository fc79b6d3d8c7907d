//! Summary statistics over trial durations.

use dbcompare_core::{BenchError, Result};
use serde::{Deserialize, Serialize};

/// Summary of a duration sequence, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Smallest duration
    pub min: f64,
    /// Largest duration
    pub max: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Middle of the sorted sequence; mean of the two middle values for even lengths
    pub median: f64,
    /// Population standard deviation (divisor N)
    pub std_dev: f64,
    /// Sum of all durations
    pub total: f64,
}

/// Reduce `durations` to a [`Summary`].
///
/// # Errors
///
/// Returns [`BenchError::Statistics`] if `durations` is empty or contains a
/// negative or non-finite value.
pub fn summarize(durations: &[f64]) -> Result<Summary> {
    if durations.is_empty() {
        return Err(BenchError::Statistics(
            "cannot summarize an empty duration sequence".to_string(),
        ));
    }
    if let Some(bad) = durations.iter().find(|d| !d.is_finite() || **d < 0.0) {
        return Err(BenchError::Statistics(format!(
            "durations must be finite and non-negative, got {bad}"
        )));
    }

    let mut sorted = durations.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let total: f64 = sorted.iter().sum();
    let mean = total / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let variance = sorted
        .iter()
        .map(|d| {
            let diff = d - mean;
            diff * diff
        })
        .sum::<f64>()
        / n as f64;

    // Rounding can push the mean a hair outside [min, max] for near-equal values.
    let min = sorted[0];
    let max = sorted[n - 1];
    Ok(Summary {
        min,
        max,
        mean: mean.clamp(min, max),
        median,
        std_dev: variance.sqrt(),
        total,
    })
}
