// Copyright 2025 DB Compare Contributors
// SPDX-License-Identifier: Apache-2.0

//! ScyllaDB connector.
//!
//! Each [`Connector::connect`] opens its own driver session, trying the
//! configured contact points in order. The keyspace is created on connect
//! with `SimpleStrategy` replication and selected for the session.
//!
//! Filtering on `user_id` and `category` relies on secondary indexes plus
//! `ALLOW FILTERING`; neither column is part of the primary key.

use async_trait::async_trait;
use dbcompare_core::config::ScyllaConfig;
use dbcompare_core::{BenchError, BenchmarkRow, DatabaseKind, Result};
use scylla::prepared_statement::PreparedStatement;
use scylla::{QueryResult, Session, SessionBuilder};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{Connector, Handle, QueryOutput, Statement, TABLE_NAME};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn op_err(e: impl std::fmt::Display) -> BenchError {
    BenchError::operation(DatabaseKind::Scylla, e.to_string())
}

fn row_count(result: &QueryResult) -> u64 {
    result.rows.as_ref().map_or(0, |rows| rows.len() as u64)
}

/// Connector for a ScyllaDB cluster.
#[derive(Debug, Clone)]
pub struct ScyllaConnector {
    config: ScyllaConfig,
}

impl ScyllaConnector {
    /// Create a connector; no connection is attempted yet.
    pub fn new(config: ScyllaConfig) -> Self {
        Self { config }
    }

    async fn open_session(&self) -> Result<Session> {
        let mut last_error = String::from("no hosts configured");

        for host in &self.config.hosts {
            let node = format!("{}:{}", host, self.config.port);
            info!(node = %node, "connecting to ScyllaDB");

            let mut builder = SessionBuilder::new()
                .known_node(&node)
                .connection_timeout(CONNECT_TIMEOUT);
            if let (Some(user), Some(password)) = (&self.config.username, &self.config.password) {
                builder = builder.user(user, password);
            }

            match builder.build().await {
                Ok(session) => {
                    info!(node = %node, "connected to ScyllaDB");
                    return Ok(session);
                }
                Err(e) => {
                    warn!(node = %node, error = %e, "failed to connect to ScyllaDB host");
                    last_error = format!("{node}: {e}");
                }
            }
        }

        Err(BenchError::connection(
            DatabaseKind::Scylla,
            format!("no ScyllaDB host reachable (last error: {last_error})"),
        ))
    }
}

#[async_trait]
impl Connector for ScyllaConnector {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Scylla
    }

    async fn connect(&self) -> Result<Box<dyn Handle>> {
        let session = self.open_session().await?;
        let keyspace = &self.config.keyspace;

        session
            .query(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {keyspace} WITH replication = \
                     {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
                    self.config.replication_factor
                ),
                (),
            )
            .await
            .map_err(|e| BenchError::connection(DatabaseKind::Scylla, e.to_string()))?;
        session
            .use_keyspace(keyspace.as_str(), false)
            .await
            .map_err(|e| BenchError::connection(DatabaseKind::Scylla, e.to_string()))?;

        Ok(Box::new(ScyllaHandle {
            session: Some(session),
            insert: None,
        }))
    }
}

/// An open ScyllaDB session bound to the benchmark keyspace.
pub struct ScyllaHandle {
    session: Option<Session>,
    insert: Option<PreparedStatement>,
}

impl ScyllaHandle {
    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| op_err("handle is closed"))
    }

    async fn prepared_insert(&mut self) -> Result<PreparedStatement> {
        if let Some(prepared) = &self.insert {
            return Ok(prepared.clone());
        }
        let prepared = self
            .session()?
            .prepare(format!(
                "INSERT INTO {TABLE_NAME} \
                 (id, timestamp, user_id, value, category, tags, metadata) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)"
            ))
            .await
            .map_err(op_err)?;
        self.insert = Some(prepared.clone());
        Ok(prepared)
    }

    async fn insert(&mut self, row: &BenchmarkRow) -> Result<()> {
        let prepared = self.prepared_insert().await?;
        let values = (
            row.uuid()?,
            row.parsed_timestamp()?,
            row.user_id,
            row.value,
            row.category.as_str(),
            row.tags.clone(),
            row.metadata.as_str(),
        );
        self.session()?
            .execute(&prepared, values)
            .await
            .map_err(op_err)?;
        Ok(())
    }

    async fn load_dataset(&mut self, path: &Path) -> Result<u64> {
        let file = tokio::fs::File::open(path).await.map_err(|e| {
            BenchError::Dataset(format!("cannot open {}: {}", path.display(), e))
        })?;
        let mut lines = BufReader::new(file).lines();
        let mut loaded = 0;

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let row = BenchmarkRow::from_json_line(&line)?;
            self.insert(&row).await?;
            loaded += 1;
        }

        debug!(rows = loaded, path = %path.display(), "dataset loaded into ScyllaDB");
        Ok(loaded)
    }

    async fn sample_categories(&self, limit: usize) -> Result<Vec<String>> {
        // DISTINCT only applies to partition keys, so deduplicate client-side.
        let result = self
            .session()?
            .query(format!("SELECT category FROM {TABLE_NAME} LIMIT {limit}"), ())
            .await
            .map_err(op_err)?;
        let mut categories = Vec::new();
        for row in result.rows_typed::<(Option<String>,)>().map_err(op_err)? {
            if let (Some(category),) = row.map_err(op_err)? {
                if !categories.contains(&category) {
                    categories.push(category);
                }
            }
        }
        Ok(categories)
    }
}

#[async_trait]
impl Handle for ScyllaHandle {
    async fn execute(&mut self, statement: &Statement) -> Result<QueryOutput> {
        match statement {
            Statement::CreateTable => {
                self.session()?
                    .query(
                        format!(
                            "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (\
                             id UUID PRIMARY KEY, timestamp TIMESTAMP, user_id INT, value FLOAT, \
                             category TEXT, tags LIST<TEXT>, metadata TEXT)"
                        ),
                        (),
                    )
                    .await
                    .map_err(op_err)?;
                Ok(QueryOutput::default())
            }
            Statement::CreateIndex(column) => {
                self.session()?
                    .query(
                        format!(
                            "CREATE INDEX IF NOT EXISTS ON {TABLE_NAME} ({})",
                            column.as_str()
                        ),
                        (),
                    )
                    .await
                    .map_err(op_err)?;
                Ok(QueryOutput::default())
            }
            Statement::LoadDataset(path) => Ok(QueryOutput::rows(self.load_dataset(path).await?)),
            Statement::SampleIds { limit } => {
                let result = self
                    .session()?
                    .query(format!("SELECT id FROM {TABLE_NAME} LIMIT {limit}"), ())
                    .await
                    .map_err(op_err)?;
                let ids = result
                    .rows_typed::<(Uuid,)>()
                    .map_err(op_err)?
                    .map(|row| row.map(|(id,)| id.to_string()).map_err(op_err))
                    .collect::<Result<Vec<_>>>()?;
                Ok(QueryOutput::values(ids))
            }
            Statement::SampleCategories { limit } => {
                Ok(QueryOutput::values(self.sample_categories(*limit).await?))
            }
            Statement::PointLookup { id } => {
                let id = Uuid::parse_str(id).map_err(op_err)?;
                let result = self
                    .session()?
                    .query(format!("SELECT * FROM {TABLE_NAME} WHERE id = ?"), (id,))
                    .await
                    .map_err(op_err)?;
                Ok(QueryOutput::rows(row_count(&result)))
            }
            Statement::RangeScan {
                min_user_id,
                max_user_id,
            } => {
                let result = self
                    .session()?
                    .query(
                        format!(
                            "SELECT * FROM {TABLE_NAME} WHERE user_id >= ? AND user_id <= ? \
                             ALLOW FILTERING"
                        ),
                        (*min_user_id, *max_user_id),
                    )
                    .await
                    .map_err(op_err)?;
                Ok(QueryOutput::rows(row_count(&result)))
            }
            Statement::CategoryAggregate { category } => {
                // Only COUNT is pushed down; richer aggregates are not supported
                // on a secondary-index filter.
                let result = self
                    .session()?
                    .query(
                        format!(
                            "SELECT COUNT(*) FROM {TABLE_NAME} WHERE category = ? ALLOW FILTERING"
                        ),
                        (category.as_str(),),
                    )
                    .await
                    .map_err(op_err)?;
                let count = result
                    .first_row_typed::<(i64,)>()
                    .map(|(count,)| count.max(0) as u64)
                    .map_err(op_err)?;
                Ok(QueryOutput::rows(count))
            }
            Statement::Insert(row) => {
                self.insert(row).await?;
                Ok(QueryOutput::rows(1))
            }
            Statement::UpdateValue {
                id,
                value,
                timestamp,
            } => {
                let id = Uuid::parse_str(id).map_err(op_err)?;
                self.session()?
                    .query(
                        format!("UPDATE {TABLE_NAME} SET value = ?, timestamp = ? WHERE id = ?"),
                        (*value, *timestamp, id),
                    )
                    .await
                    .map_err(op_err)?;
                Ok(QueryOutput::rows(1))
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.session.take().is_some() {
            self.insert = None;
            debug!("ScyllaDB session closed");
        }
        Ok(())
    }
}
