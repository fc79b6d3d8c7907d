//! Timed-trial harness.
//!
//! A trial runs a workload a number of untimed warmup iterations followed by
//! the measured iterations. Iterations never overlap. The runner does not
//! catch workload errors: the first failure aborts the trial and is returned
//! tagged with the benchmark name and database.

use dbcompare_core::{BenchError, DatabaseKind, DegradedIterations, Result};
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::result::BenchmarkResult;

/// What a single workload invocation reports back to the runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationReport {
    /// Operations that failed but were tolerated by a lenient policy.
    pub failed_operations: u64,
}

impl IterationReport {
    /// An iteration in which every operation succeeded.
    pub fn clean() -> Self {
        Self::default()
    }

    /// An iteration with `failed_operations` tolerated failures.
    pub fn degraded(failed_operations: u64) -> Self {
        Self { failed_operations }
    }

    /// Whether any operation failed.
    pub fn is_degraded(&self) -> bool {
        self.failed_operations > 0
    }
}

/// Loop bounds of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialOptions {
    /// Measured iterations; must be at least 1.
    pub iterations: usize,
    /// Untimed iterations run first.
    pub warmup_iterations: usize,
    /// Whether degraded iterations count toward the statistics.
    pub degraded: DegradedIterations,
}

impl TrialOptions {
    /// Options with the default degraded-iteration accounting.
    pub fn new(iterations: usize, warmup_iterations: usize) -> Self {
        Self {
            iterations,
            warmup_iterations,
            degraded: DegradedIterations::default(),
        }
    }

    /// Set how degraded iterations are accounted.
    pub fn with_degraded(mut self, degraded: DegradedIterations) -> Self {
        self.degraded = degraded;
        self
    }
}

/// Run `workload` as a trial and summarize the measured durations.
///
/// The workload is invoked exactly `warmup_iterations + iterations` times.
///
/// # Errors
///
/// - [`BenchError::Statistics`] if `iterations` is zero (the workload is not
///   invoked) or every measured iteration was excluded as degraded.
/// - Any error returned by the workload, wrapped in [`BenchError::Trial`].
pub async fn run_trial<F, Fut>(
    name: &str,
    database: DatabaseKind,
    options: TrialOptions,
    mut workload: F,
) -> Result<BenchmarkResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<IterationReport>>,
{
    if options.iterations == 0 {
        return Err(BenchError::Statistics(format!(
            "benchmark `{name}` requested zero iterations"
        ))
        .in_trial(name, database));
    }

    info!(benchmark = name, %database, "running benchmark");

    for i in 0..options.warmup_iterations {
        debug!(
            benchmark = name,
            %database,
            "warmup iteration {}/{}",
            i + 1,
            options.warmup_iterations
        );
        workload().await.map_err(|e| e.in_trial(name, database))?;
    }

    let mut durations = Vec::with_capacity(options.iterations);
    let mut degraded_iterations = 0;
    for i in 0..options.iterations {
        let start = Instant::now();
        let outcome = workload().await;
        let elapsed = start.elapsed().as_secs_f64();
        let report = outcome.map_err(|e| e.in_trial(name, database))?;

        if report.is_degraded() {
            degraded_iterations += 1;
            warn!(
                benchmark = name,
                %database,
                failed_operations = report.failed_operations,
                "iteration {} completed with tolerated failures",
                i + 1
            );
            if options.degraded == DegradedIterations::Exclude {
                continue;
            }
        }
        debug!(
            benchmark = name,
            %database,
            "iteration {}/{} completed in {:.4} seconds",
            i + 1,
            options.iterations,
            elapsed
        );
        durations.push(elapsed);
    }

    let result = BenchmarkResult::from_durations(name, database, durations, degraded_iterations)
        .map_err(|e| e.in_trial(name, database))?;
    info!(
        benchmark = name,
        %database,
        mean = result.mean,
        median = result.median,
        "benchmark finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_warmup_and_measured_call_counts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result = run_trial("count", DatabaseKind::Scylla, TrialOptions::new(5, 2), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(IterationReport::clean())
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 7);
        assert_eq!(result.durations.len(), 5);
        assert_eq!(result.iterations, 5);
        assert_eq!(result.database, DatabaseKind::Scylla);
    }

    proptest! {
        #[test]
        fn test_call_counts_match_options(iterations in 1..8usize, warmup in 0..5usize) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let mut calls = 0;
            let options = TrialOptions::new(iterations, warmup);
            let result = runtime
                .block_on(run_trial("count", DatabaseKind::DuckDb, options, || {
                    calls += 1;
                    async { Ok(IterationReport::clean()) }
                }))
                .unwrap();

            prop_assert_eq!(calls, iterations + warmup);
            prop_assert_eq!(result.iterations, iterations);
            prop_assert_eq!(result.durations.len(), iterations);
            prop_assert_eq!(result.degraded_iterations, 0);
        }

        #[test]
        fn test_excluded_degraded_iterations_shrink_durations(
            pattern in prop::collection::vec(any::<bool>(), 1..10),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let degraded = pattern.iter().filter(|d| **d).count();
            let options = TrialOptions::new(pattern.len(), 0)
                .with_degraded(DegradedIterations::Exclude);
            let mut reports = pattern.iter().map(|d| {
                if *d {
                    IterationReport::degraded(1)
                } else {
                    IterationReport::clean()
                }
            });
            let outcome = runtime.block_on(run_trial("mixed", DatabaseKind::DuckDb, options, || {
                let report = reports.next().unwrap_or_default();
                async move { Ok(report) }
            }));

            if degraded == pattern.len() {
                prop_assert!(outcome.is_err());
            } else {
                let result = outcome.unwrap();
                prop_assert_eq!(result.durations.len(), pattern.len() - degraded);
                prop_assert_eq!(result.degraded_iterations, degraded);
            }
        }
    }

    #[tokio::test]
    async fn test_durations_follow_call_order() {
        let mut delays = vec![20_u64, 1, 10].into_iter();
        let result = run_trial("order", DatabaseKind::DuckDb, TrialOptions::new(3, 0), || {
            let delay = delays.next().unwrap_or(0);
            async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(IterationReport::clean())
            }
        })
        .await
        .unwrap();

        assert!(result.durations[0] >= 0.020);
        assert!(result.durations[0] > result.durations[1]);
        assert!(result.durations[2] >= 0.010);
    }

    #[tokio::test]
    async fn test_workload_error_aborts_trial() {
        let mut calls = 0;
        let err = run_trial("fails", DatabaseKind::Scylla, TrialOptions::new(5, 1), || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt == 3 {
                    Err(BenchError::operation(DatabaseKind::Scylla, "write timeout"))
                } else {
                    Ok(IterationReport::clean())
                }
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls, 3);
        match err {
            BenchError::Trial { benchmark, database, source } => {
                assert_eq!(benchmark, "fails");
                assert_eq!(database, DatabaseKind::Scylla);
                assert!(matches!(*source, BenchError::Operation { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_warmup_error_propagates() {
        let err = run_trial("warmup", DatabaseKind::DuckDb, TrialOptions::new(1, 1), || async {
            Err(BenchError::connection(DatabaseKind::DuckDb, "locked"))
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("locked"));
    }

    #[tokio::test]
    async fn test_zero_iterations_never_invokes_workload() {
        let mut calls = 0;
        let err = run_trial("empty", DatabaseKind::Scylla, TrialOptions::new(0, 3), || {
            calls += 1;
            async { Ok(IterationReport::clean()) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls, 0);
        assert!(err.to_string().contains("zero iterations"));
    }

    #[tokio::test]
    async fn test_degraded_iterations_included_by_default() {
        let mut calls = 0;
        let result = run_trial("mixed", DatabaseKind::DuckDb, TrialOptions::new(4, 0), || {
            calls += 1;
            let report = if calls % 2 == 0 {
                IterationReport::degraded(2)
            } else {
                IterationReport::clean()
            };
            async move { Ok(report) }
        })
        .await
        .unwrap();
        assert_eq!(result.iterations, 4);
        assert_eq!(result.degraded_iterations, 2);
    }

    #[tokio::test]
    async fn test_degraded_iterations_excluded_on_request() {
        let mut calls = 0;
        let options = TrialOptions::new(4, 0).with_degraded(DegradedIterations::Exclude);
        let result = run_trial("mixed", DatabaseKind::DuckDb, options, || {
            calls += 1;
            let report = if calls == 1 {
                IterationReport::degraded(1)
            } else {
                IterationReport::clean()
            };
            async move { Ok(report) }
        })
        .await
        .unwrap();
        assert_eq!(result.iterations, 3);
        assert_eq!(result.durations.len(), 3);
        assert_eq!(result.degraded_iterations, 1);
    }

    #[tokio::test]
    async fn test_all_iterations_excluded_is_a_statistics_error() {
        let options = TrialOptions::new(2, 0).with_degraded(DegradedIterations::Exclude);
        let err = run_trial("broken", DatabaseKind::DuckDb, options, || async {
            Ok(IterationReport::degraded(10))
        })
        .await
        .unwrap_err();
        match err {
            BenchError::Trial { source, .. } => {
                assert!(matches!(*source, BenchError::Statistics(_)))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
