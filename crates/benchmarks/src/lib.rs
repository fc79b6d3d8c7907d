//! Benchmark execution and statistics engine for dbcompare.
//!
//! This crate runs workloads as timed trials and turns the measurements into
//! comparable results.
//!
//! # Quick Start
//!
//! ```no_run
//! use dbcompare_benchmarks::{run_trial, IterationReport, ResultStore, TrialOptions};
//! use dbcompare_core::{DatabaseKind, ExportFormat};
//!
//! # async fn example() -> dbcompare_core::Result<()> {
//! let mut store = ResultStore::new();
//! let result = run_trial("noop", DatabaseKind::DuckDb, TrialOptions::new(5, 1), || async {
//!     Ok(IterationReport::clean())
//! })
//! .await?;
//! store.record("noop", result);
//! dbcompare_benchmarks::io::export(&store, "results", ExportFormat::All)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`trial`] - warmup + measured iterations of a workload
//! - [`stats`] - min / max / mean / median / std_dev / total
//! - [`fanout`] - concurrent workers with strict or lenient failure handling
//! - [`result`] - the [`BenchmarkResult`] record
//! - [`store`] - the per-run [`ResultStore`]
//! - [`io`] - CSV / JSON / Markdown export
//! - [`markdown`] - Markdown report generation

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod fanout;
pub mod io;
pub mod markdown;
pub mod result;
pub mod stats;
pub mod store;
pub mod trial;

pub use fanout::{run_concurrent, FanOutReport, WorkerOutcome, WorkerStats};
pub use result::BenchmarkResult;
pub use stats::{summarize, Summary};
pub use store::ResultStore;
pub use trial::{run_trial, IterationReport, TrialOptions};
