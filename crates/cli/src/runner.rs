//! Suite orchestration.
//!
//! A [`Harness`] owns the configuration, the connectors and the run's
//! [`ResultStore`]. Every suite runs each connector in turn as a trial and
//! exports the whole store once the suite is done, so an aborted run still
//! leaves the results of the suites that finished.

use dbcompare_adapters::workloads::{self, WorkloadSettings};
use dbcompare_adapters::Connector;
use dbcompare_benchmarks::{io, run_trial, FanOutReport, ResultStore, TrialOptions};
use dbcompare_core::{BenchConfig, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::{selects, QueryKind, Suite};

/// Drives the benchmark suites for one run.
pub struct Harness {
    config: BenchConfig,
    settings: WorkloadSettings,
    connectors: Vec<Arc<dyn Connector>>,
    store: ResultStore,
}

impl Harness {
    /// Create a harness; suites run the connectors in the given order.
    pub fn new(config: BenchConfig, connectors: Vec<Arc<dyn Connector>>) -> Self {
        let settings = WorkloadSettings::from(&config.benchmarks);
        Self {
            config,
            settings,
            connectors,
            store: ResultStore::new(),
        }
    }

    /// The configuration in effect.
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Everything recorded so far.
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    fn options(&self) -> TrialOptions {
        TrialOptions::new(
            self.config.benchmarks.iterations,
            self.config.benchmarks.warmup_iterations,
        )
        .with_degraded(self.config.benchmarks.degraded_iterations)
    }

    fn export(&self) -> Result<Vec<PathBuf>> {
        io::export(
            &self.store,
            &self.config.output.results_dir,
            self.config.output.format,
        )
    }

    /// Run the selected suites against dataset `size`.
    pub async fn run_size(
        &mut self,
        size: &str,
        suites: &[Suite],
        queries: &[QueryKind],
    ) -> Result<()> {
        if selects(suites, Suite::DataLoading, Suite::All) {
            self.data_loading(size).await?;
        }
        if selects(suites, Suite::Queries, Suite::All) {
            self.queries(size, queries).await?;
        }
        if selects(suites, Suite::Concurrent, Suite::All) {
            self.concurrent(size).await?;
        }
        Ok(())
    }

    /// `data_loading_{size}`: create the table, then load the dataset every iteration.
    pub async fn data_loading(&mut self, size: &str) -> Result<()> {
        let name = format!("data_loading_{size}");
        let path = self.config.data.size(size)?.file_path.clone();
        info!(benchmark = %name, path = %path.display(), "running data loading suite");

        for connector in self.connectors.clone() {
            let kind = connector.kind();
            workloads::create_table(connector.as_ref())
                .await
                .map_err(|e| e.in_trial(&name, kind))?;

            let result = run_trial(&name, kind, self.options(), || {
                let connector = connector.clone();
                let path = path.clone();
                async move { workloads::load_dataset(connector.as_ref(), &path).await }
            })
            .await?;
            self.store.record(&name, result);
        }

        self.export()?;
        Ok(())
    }

    /// `point_query_{size}`, `range_query_{size}` and `aggregation_query_{size}`.
    pub async fn queries(&mut self, size: &str, queries: &[QueryKind]) -> Result<()> {
        if selects(queries, QueryKind::Point, QueryKind::All) {
            self.query_suite(format!("point_query_{size}"), QueryKind::Point)
                .await?;
        }
        if selects(queries, QueryKind::Range, QueryKind::All) {
            self.query_suite(format!("range_query_{size}"), QueryKind::Range)
                .await?;
        }
        if selects(queries, QueryKind::Aggregation, QueryKind::All) {
            self.query_suite(format!("aggregation_query_{size}"), QueryKind::Aggregation)
                .await?;
        }
        Ok(())
    }

    async fn query_suite(&mut self, name: String, kind: QueryKind) -> Result<()> {
        info!(benchmark = %name, "running query suite");
        let settings = self.settings;

        for connector in self.connectors.clone() {
            let mut iteration = 0_u64;
            let result = run_trial(&name, connector.kind(), self.options(), || {
                iteration += 1;
                let connector = connector.clone();
                let mut rng = settings.rng(iteration);
                async move {
                    let connector = connector.as_ref();
                    match kind {
                        QueryKind::Range => {
                            workloads::range_queries(connector, &settings, &mut rng).await
                        }
                        QueryKind::Aggregation => {
                            workloads::aggregation_queries(connector, &settings, &mut rng).await
                        }
                        QueryKind::Point | QueryKind::All => {
                            workloads::point_queries(connector, &settings, &mut rng).await
                        }
                    }
                }
            })
            .await?;
            self.store.record(&name, result);
        }

        self.export()?;
        Ok(())
    }

    /// `concurrent_{level}_{size}` for every configured concurrency level.
    pub async fn concurrent(&mut self, size: &str) -> Result<()> {
        let settings = self.settings;

        for level in self.config.benchmarks.concurrency.clone() {
            let name = format!("concurrent_{level}_{size}");
            info!(benchmark = %name, workers = level, "running concurrent suite");

            for connector in self.connectors.clone() {
                let policy = self.config.databases.failure_policy(connector.kind());
                let mut iteration = 0_u64;
                let result = run_trial(&name, connector.kind(), self.options(), || {
                    iteration += 1;
                    let connector = connector.clone();
                    let current = iteration;
                    async move {
                        workloads::concurrent_mixed(connector, level, &settings, policy, current)
                            .await
                            .map(FanOutReport::into_iteration_report)
                    }
                })
                .await?;
                self.store.record(&name, result);
            }

            self.export()?;
        }
        Ok(())
    }
}
