//! Concurrency fan-out.
//!
//! [`run_concurrent`] launches a fixed number of independent worker tasks and
//! waits for every one of them before returning, so the calling trial
//! iteration's clock covers the slowest worker. The harness adds no
//! synchronization between workers: consistency of their operations against
//! the shared target is the target's business.
//!
//! Failures are handled as data. Every worker yields a [`WorkerOutcome`] and
//! the [`FailurePolicy`] decides, over the collected outcomes, whether the
//! fan-out fails (strict) or reports a degraded run (lenient).

use dbcompare_core::{BenchError, FailurePolicy, Result};
use futures::future::join_all;
use std::future::Future;
use tracing::instrument::WithSubscriber;
use tracing::warn;

use crate::trial::IterationReport;

/// Operation counts of one worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Operations that succeeded.
    pub completed: u64,
    /// Operations that failed and were tolerated.
    pub failed: u64,
}

impl WorkerStats {
    /// Route one operation's result through `policy`.
    ///
    /// Under [`FailurePolicy::Strict`] an error is returned to the caller;
    /// under [`FailurePolicy::Lenient`] it is logged at WARN and counted.
    pub fn absorb<T>(&mut self, policy: FailurePolicy, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => {
                self.completed += 1;
                Ok(Some(value))
            }
            Err(err) => match policy {
                FailurePolicy::Strict => Err(err),
                FailurePolicy::Lenient => {
                    warn!(error = %err, "operation failed, continuing under lenient policy");
                    self.failed += 1;
                    Ok(None)
                }
            },
        }
    }
}

/// The result of one worker task.
#[derive(Debug)]
pub struct WorkerOutcome {
    /// Worker index in `[0, worker_count)`.
    pub worker: usize,
    /// Success with operation counts, or the error that stopped the worker.
    pub result: Result<WorkerStats>,
}

/// Aggregate of a completed fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Workers launched.
    pub workers: usize,
    /// Workers that returned an error or panicked.
    pub failed_workers: usize,
    /// Successful operations across all workers that finished.
    pub completed_operations: u64,
    /// Tolerated operation failures across all workers that finished.
    pub failed_operations: u64,
}

impl FanOutReport {
    /// Whether anything failed.
    pub fn is_degraded(&self) -> bool {
        self.failed_workers > 0 || self.failed_operations > 0
    }

    /// Convert into the report a trial iteration returns.
    ///
    /// A failed worker counts as one failed operation so the iteration is
    /// visibly degraded even if the worker never got to count its own.
    pub fn into_iteration_report(self) -> IterationReport {
        IterationReport::degraded(self.failed_operations + self.failed_workers as u64)
    }
}

/// Apply `policy` to the collected outcomes.
///
/// Strict: the first failure by worker index is returned. Lenient: every
/// failure is logged at WARN and the report counts them.
pub fn resolve_outcomes(
    policy: FailurePolicy,
    outcomes: Vec<WorkerOutcome>,
) -> Result<FanOutReport> {
    let mut report = FanOutReport {
        workers: outcomes.len(),
        ..FanOutReport::default()
    };

    let mut outcomes = outcomes;
    outcomes.sort_by_key(|o| o.worker);

    for outcome in outcomes {
        match outcome.result {
            Ok(stats) => {
                report.completed_operations += stats.completed;
                report.failed_operations += stats.failed;
            }
            Err(err) => match policy {
                FailurePolicy::Strict => return Err(err),
                FailurePolicy::Lenient => {
                    warn!(
                        worker = outcome.worker,
                        error = %err,
                        "worker failed, continuing under lenient policy"
                    );
                    report.failed_workers += 1;
                }
            },
        }
    }
    Ok(report)
}

/// Run `worker(i)` for every `i` in `0..worker_count` as concurrent tasks and
/// wait for all of them.
///
/// Each task inherits the caller's logging dispatcher. A panicking worker is
/// reported as [`BenchError::WorkerPanicked`] and handled like any other
/// failure. No task is cancelled once launched.
///
/// # Errors
///
/// - [`BenchError::Configuration`] if `worker_count` is zero.
/// - Under [`FailurePolicy::Strict`], the first worker failure.
pub async fn run_concurrent<W, Fut>(
    worker: W,
    worker_count: usize,
    policy: FailurePolicy,
) -> Result<FanOutReport>
where
    W: Fn(usize) -> Fut,
    Fut: Future<Output = Result<WorkerStats>> + Send + 'static,
{
    if worker_count == 0 {
        return Err(BenchError::Configuration(
            "fan-out requires at least one worker".to_string(),
        ));
    }

    let handles: Vec<_> = (0..worker_count)
        .map(|i| tokio::spawn(worker(i).with_current_subscriber()))
        .collect();

    let outcomes = join_all(handles)
        .await
        .into_iter()
        .enumerate()
        .map(|(worker, joined)| WorkerOutcome {
            worker,
            result: joined.unwrap_or_else(|e| {
                Err(BenchError::WorkerPanicked {
                    worker,
                    message: e.to_string(),
                })
            }),
        })
        .collect();

    resolve_outcomes(policy, outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbcompare_core::DatabaseKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    type WorkerFuture = std::pin::Pin<Box<dyn Future<Output = Result<WorkerStats>> + Send>>;

    fn failing_worker(failing: &'static [usize]) -> impl Fn(usize) -> WorkerFuture {
        move |i| -> WorkerFuture {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                if failing.contains(&i) {
                    let message = format!("conflict in worker {i}");
                    Err(BenchError::operation(DatabaseKind::DuckDb, message))
                } else {
                    Ok(WorkerStats { completed: 10, failed: 0 })
                }
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_worker_runs_before_return() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let report = run_concurrent(
            |_| {
                let started = started.clone();
                let finished = finished.clone();
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(WorkerStats { completed: 3, failed: 0 })
                }
            },
            8,
            FailurePolicy::Strict,
        )
        .await
        .unwrap();

        assert_eq!(started.load(Ordering::SeqCst), 8);
        assert_eq!(finished.load(Ordering::SeqCst), 8);
        assert_eq!(report.workers, 8);
        assert_eq!(report.completed_operations, 24);
        assert!(!report.is_degraded());
    }

    #[tokio::test]
    async fn test_strict_policy_fails_on_single_worker_error() {
        let err = run_concurrent(failing_worker(&[5]), 8, FailurePolicy::Strict)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("worker 5"));
    }

    #[tokio::test]
    async fn test_strict_policy_reports_lowest_failing_worker() {
        let err = run_concurrent(failing_worker(&[6, 2]), 8, FailurePolicy::Strict)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("worker 2"));
    }

    #[tokio::test]
    async fn test_lenient_policy_tolerates_worker_errors() {
        let report = run_concurrent(failing_worker(&[1, 4]), 8, FailurePolicy::Lenient)
            .await
            .unwrap();
        assert_eq!(report.workers, 8);
        assert_eq!(report.failed_workers, 2);
        assert_eq!(report.completed_operations, 60);
        assert!(report.is_degraded());
        assert_eq!(report.into_iteration_report().failed_operations, 2);
    }

    #[tokio::test]
    async fn test_panicking_worker_is_an_outcome() {
        let report = run_concurrent(
            |i| async move {
                if i == 0 {
                    panic!("worker blew up");
                }
                Ok(WorkerStats::default())
            },
            3,
            FailurePolicy::Lenient,
        )
        .await
        .unwrap();
        assert_eq!(report.failed_workers, 1);

        let err = run_concurrent(
            |i| async move {
                if i == 1 {
                    panic!("worker blew up");
                }
                Ok(WorkerStats::default())
            },
            3,
            FailurePolicy::Strict,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BenchError::WorkerPanicked { worker: 1, .. }));
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let result = run_concurrent(failing_worker(&[]), 0, FailurePolicy::Strict).await;
        assert!(matches!(result, Err(BenchError::Configuration(_))));
    }

    #[test]
    fn test_absorb_follows_policy() {
        let mut stats = WorkerStats::default();
        let ok: Result<u32> = Ok(1);
        assert_eq!(stats.absorb(FailurePolicy::Strict, ok).unwrap(), Some(1));

        let failed: Result<u32> = Err(BenchError::operation(DatabaseKind::DuckDb, "conflict"));
        assert_eq!(stats.absorb(FailurePolicy::Lenient, failed).unwrap(), None);

        let failed: Result<u32> = Err(BenchError::operation(DatabaseKind::DuckDb, "conflict"));
        assert!(stats.absorb(FailurePolicy::Strict, failed).is_err());

        assert_eq!(stats, WorkerStats { completed: 1, failed: 1 });
    }

    #[test]
    fn test_resolve_outcomes_is_pure() {
        let outcomes = vec![
            WorkerOutcome { worker: 1, result: Ok(WorkerStats { completed: 4, failed: 1 }) },
            WorkerOutcome {
                worker: 0,
                result: Err(BenchError::operation(DatabaseKind::DuckDb, "conflict")),
            },
        ];
        let report = resolve_outcomes(FailurePolicy::Lenient, outcomes).unwrap();
        assert_eq!(
            report,
            FanOutReport {
                workers: 2,
                failed_workers: 1,
                completed_operations: 4,
                failed_operations: 1,
            }
        );
    }
}
