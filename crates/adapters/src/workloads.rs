// Copyright 2025 DB Compare Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark workloads.
//!
//! Each function here is one iteration body: it opens its own handle, runs its
//! statements, closes the handle and reports how many operations failed. The
//! same code drives every engine through the [`Connector`] trait.

use chrono::Utc;
use dbcompare_benchmarks::{run_concurrent, FanOutReport, IterationReport, WorkerStats};
use dbcompare_core::config::BenchmarksConfig;
use dbcompare_core::{BenchError, BenchmarkRow, FailurePolicy, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{Connector, Handle, IndexedColumn, Statement};

/// Width of every range-scan window on `user_id`.
pub const RANGE_WIDTH: i32 = 100_000;

/// Largest lower bound of a range-scan window.
pub const RANGE_MAX_START: i32 = 900_000;

/// Categories sampled before aggregation queries.
pub const CATEGORY_SAMPLE: usize = 100;

/// Workload sizes taken from the `benchmarks` configuration section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadSettings {
    pub point_queries: usize,
    pub range_queries: usize,
    pub aggregation_queries: usize,
    pub sample_size: usize,
    pub operations_per_worker: usize,
    pub seed: Option<u64>,
}

impl From<&BenchmarksConfig> for WorkloadSettings {
    fn from(config: &BenchmarksConfig) -> Self {
        Self {
            point_queries: config.point_queries,
            range_queries: config.range_queries,
            aggregation_queries: config.aggregation_queries,
            sample_size: config.sample_size,
            operations_per_worker: config.operations_per_worker,
            seed: config.seed,
        }
    }
}

impl WorkloadSettings {
    /// RNG for one randomized stream; seeded runs give every stream its own sequence.
    pub fn rng(&self, stream: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
            None => StdRng::from_entropy(),
        }
    }
}

fn empty_table(connector: &dyn Connector, what: &str) -> BenchError {
    BenchError::operation(
        connector.kind(),
        format!("no {what} found in {}", crate::TABLE_NAME),
    )
}

fn pick<'a>(values: &'a [String], rng: &mut StdRng) -> Result<&'a String> {
    values
        .choose(rng)
        .ok_or_else(|| BenchError::Statistics("cannot pick from an empty sample".into()))
}

/// Close `handle` once its work is done, whether or not the work failed.
///
/// An error from the work takes precedence over an error from closing.
async fn finish<T>(
    connector: &dyn Connector,
    mut handle: Box<dyn Handle>,
    work: Result<T>,
) -> Result<T> {
    let closed = handle.close().await;
    match (work, closed) {
        (Ok(value), closed) => closed.map(|()| value),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(database = %connector.kind(), error = %close_err, "failed to close handle");
            Err(err)
        }
    }
}

/// Create the benchmark table.
pub async fn create_table(connector: &dyn Connector) -> Result<()> {
    let mut handle = connector.connect().await?;
    let work = handle.execute(&Statement::CreateTable).await.map(drop);
    finish(connector, handle, work).await
}

/// Load the dataset at `path` into the benchmark table.
pub async fn load_dataset(connector: &dyn Connector, path: &Path) -> Result<IterationReport> {
    let mut handle = connector.connect().await?;
    let work = handle
        .execute(&Statement::LoadDataset(path.to_path_buf()))
        .await
        .map(|output| {
            debug!(database = %connector.kind(), rows = output.row_count, "dataset loaded");
            IterationReport::clean()
        });
    finish(connector, handle, work).await
}

/// Run `point_queries` lookups of randomly chosen sampled ids.
pub async fn point_queries(
    connector: &dyn Connector,
    settings: &WorkloadSettings,
    rng: &mut StdRng,
) -> Result<IterationReport> {
    let mut handle = connector.connect().await?;
    let work = async {
        let ids = handle
            .execute(&Statement::SampleIds {
                limit: settings.sample_size,
            })
            .await?
            .values;
        if ids.is_empty() {
            return Err(empty_table(connector, "ids"));
        }

        for _ in 0..settings.point_queries {
            let id = pick(&ids, rng)?.clone();
            handle.execute(&Statement::PointLookup { id }).await?;
        }
        Ok::<_, BenchError>(IterationReport::clean())
    }
    .await;
    finish(connector, handle, work).await
}

/// Run `range_queries` scans over random `user_id` windows.
pub async fn range_queries(
    connector: &dyn Connector,
    settings: &WorkloadSettings,
    rng: &mut StdRng,
) -> Result<IterationReport> {
    let mut handle = connector.connect().await?;
    let work = async {
        handle
            .execute(&Statement::CreateIndex(IndexedColumn::UserId))
            .await?;

        for _ in 0..settings.range_queries {
            let min_user_id = rng.gen_range(1..=RANGE_MAX_START);
            handle
                .execute(&Statement::RangeScan {
                    min_user_id,
                    max_user_id: min_user_id + RANGE_WIDTH,
                })
                .await?;
        }
        Ok::<_, BenchError>(IterationReport::clean())
    }
    .await;
    finish(connector, handle, work).await
}

/// Run `aggregation_queries` grouped aggregates over sampled categories.
pub async fn aggregation_queries(
    connector: &dyn Connector,
    settings: &WorkloadSettings,
    rng: &mut StdRng,
) -> Result<IterationReport> {
    let mut handle = connector.connect().await?;
    let work = async {
        handle
            .execute(&Statement::CreateIndex(IndexedColumn::Category))
            .await?;
        let categories = handle
            .execute(&Statement::SampleCategories {
                limit: CATEGORY_SAMPLE,
            })
            .await?
            .values;
        if categories.is_empty() {
            return Err(empty_table(connector, "categories"));
        }

        for _ in 0..settings.aggregation_queries {
            let category = pick(&categories, rng)?.clone();
            handle
                .execute(&Statement::CategoryAggregate { category })
                .await?;
        }
        Ok::<_, BenchError>(IterationReport::clean())
    }
    .await;
    finish(connector, handle, work).await
}

/// The statement a mixed worker runs as its `op`-th operation.
fn mixed_statement(op: usize, ids: &[String], rng: &mut StdRng) -> Result<Statement> {
    Ok(match op % 3 {
        0 => Statement::PointLookup {
            id: pick(ids, rng)?.clone(),
        },
        1 => Statement::Insert(BenchmarkRow::random(rng)),
        _ => Statement::UpdateValue {
            id: pick(ids, rng)?.clone(),
            value: rng.gen_range(0.0..1000.0),
            timestamp: Utc::now(),
        },
    })
}

/// One fan-out worker: its own handle, `operations` reads, inserts and updates.
pub async fn mixed_worker(
    connector: Arc<dyn Connector>,
    ids: Arc<[String]>,
    operations: usize,
    policy: FailurePolicy,
    mut rng: StdRng,
) -> Result<WorkerStats> {
    let mut handle = connector.connect().await?;
    let work = async {
        let mut stats = WorkerStats::default();
        for op in 0..operations {
            let statement = mixed_statement(op, &ids, &mut rng)?;
            let result = handle.execute(&statement).await;
            if let Err(err) = &result {
                debug!(
                    database = %connector.kind(),
                    statement = statement.kind(),
                    error = %err,
                    "operation failed"
                );
            }
            stats.absorb(policy, result)?;
        }
        Ok::<_, BenchError>(stats)
    }
    .await;
    finish(connector.as_ref(), handle, work).await
}

/// Fan out `level` mixed workers against the sampled ids.
pub async fn concurrent_mixed(
    connector: Arc<dyn Connector>,
    level: usize,
    settings: &WorkloadSettings,
    policy: FailurePolicy,
    iteration: u64,
) -> Result<FanOutReport> {
    let ids: Arc<[String]> = {
        let mut handle = connector.connect().await?;
        let sampled = handle
            .execute(&Statement::SampleIds {
                limit: settings.sample_size,
            })
            .await
            .map(|output| output.values);
        finish(connector.as_ref(), handle, sampled).await?.into()
    };
    if ids.is_empty() {
        return Err(empty_table(connector.as_ref(), "ids"));
    }

    let operations = settings.operations_per_worker;
    let base = iteration.wrapping_mul(level as u64);
    let report = run_concurrent(
        |worker| {
            let rng = settings.rng(base.wrapping_add(worker as u64));
            mixed_worker(connector.clone(), ids.clone(), operations, policy, rng)
        },
        level,
        policy,
    )
    .await?;

    debug!(
        database = %connector.kind(),
        workers = report.workers,
        failed_workers = report.failed_workers,
        failed_operations = report.failed_operations,
        "fan-out finished"
    );
    Ok(report)
}
