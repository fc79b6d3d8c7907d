// Copyright 2025 DB Compare Contributors
// SPDX-License-Identifier: Apache-2.0

//! Database connectors and benchmark workloads.
//!
//! Every engine under test implements [`Connector`], which hands out
//! [`Handle`]s. Workloads only speak the engine-neutral [`Statement`] model;
//! each connector renders statements into its own dialect.
//!
//! # Example
//!
//! ```ignore
//! use dbcompare_adapters::{connector_for, Statement};
//! use dbcompare_core::DatabaseKind;
//!
//! let connector = connector_for(DatabaseKind::DuckDb, &config.databases);
//! let mut handle = connector.connect().await?;
//! handle.execute(&Statement::CreateTable).await?;
//! handle.close().await?;
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod duckdb;
pub mod scylla;
pub mod workloads;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dbcompare_core::config::DatabasesConfig;
use dbcompare_core::{BenchmarkRow, DatabaseKind, Result};
use std::path::PathBuf;
use std::sync::Arc;

pub use self::duckdb::DuckDbConnector;
pub use self::scylla::ScyllaConnector;

/// Table every workload runs against.
pub const TABLE_NAME: &str = "benchmark_data";

/// Columns that range and aggregation workloads filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedColumn {
    UserId,
    Category,
}

impl IndexedColumn {
    /// Column name in the benchmark table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserId => "user_id",
            Self::Category => "category",
        }
    }
}

/// An engine-neutral operation against the benchmark table.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Create the benchmark table if it does not exist.
    CreateTable,
    /// Create a secondary index if the engine needs one.
    CreateIndex(IndexedColumn),
    /// Bulk-load a newline-delimited JSON dataset file.
    LoadDataset(PathBuf),
    /// Fetch up to `limit` row ids.
    SampleIds { limit: usize },
    /// Fetch up to `limit` distinct categories.
    SampleCategories { limit: usize },
    /// Read a full row by id.
    PointLookup { id: String },
    /// Read every row whose `user_id` lies in the inclusive range.
    RangeScan { min_user_id: i32, max_user_id: i32 },
    /// Aggregate the rows of one category.
    CategoryAggregate { category: String },
    /// Insert a row.
    Insert(BenchmarkRow),
    /// Overwrite `value` and `timestamp` of a row.
    UpdateValue {
        id: String,
        value: f32,
        timestamp: DateTime<Utc>,
    },
}

impl Statement {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable => "create_table",
            Self::CreateIndex(_) => "create_index",
            Self::LoadDataset(_) => "load_dataset",
            Self::SampleIds { .. } => "sample_ids",
            Self::SampleCategories { .. } => "sample_categories",
            Self::PointLookup { .. } => "point_lookup",
            Self::RangeScan { .. } => "range_scan",
            Self::CategoryAggregate { .. } => "category_aggregate",
            Self::Insert(_) => "insert",
            Self::UpdateValue { .. } => "update_value",
        }
    }
}

/// What executing a [`Statement`] produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    /// Rows read, or rows affected for writes.
    pub row_count: u64,
    /// Ids or categories for the sampling statements; empty otherwise.
    pub values: Vec<String>,
}

impl QueryOutput {
    /// Output of a statement that only counts rows.
    pub fn rows(row_count: u64) -> Self {
        Self {
            row_count,
            values: Vec::new(),
        }
    }

    /// Output of a sampling statement.
    pub fn values(values: Vec<String>) -> Self {
        Self {
            row_count: values.len() as u64,
            values,
        }
    }
}

/// An open connection to one engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Handle: Send {
    /// Execute one statement, consuming any result rows.
    async fn execute(&mut self, statement: &Statement) -> Result<QueryOutput>;

    /// Release the connection. Further use of the handle is an error.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for [`Handle`]s to one engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Engine this connector talks to.
    fn kind(&self) -> DatabaseKind;

    /// Open a new handle.
    async fn connect(&self) -> Result<Box<dyn Handle>>;
}

/// Build the connector for `kind`. Nothing is opened until [`Connector::connect`].
pub fn connector_for(kind: DatabaseKind, config: &DatabasesConfig) -> Arc<dyn Connector> {
    match kind {
        DatabaseKind::Scylla => Arc::new(ScyllaConnector::new(config.scylla.clone())),
        DatabaseKind::DuckDb => Arc::new(DuckDbConnector::new(config.duckdb.clone())),
    }
}

/// Connectors for every engine, in suite order.
pub fn all_connectors(config: &DatabasesConfig) -> Vec<Arc<dyn Connector>> {
    DatabaseKind::ALL
        .iter()
        .map(|kind| connector_for(*kind, config))
        .collect()
}
