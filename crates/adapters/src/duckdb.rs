// Copyright 2025 DB Compare Contributors
// SPDX-License-Identifier: Apache-2.0

//! DuckDB connector.
//!
//! The database is opened once per connector and every handle is a clone of
//! that root connection, so handles share one database even when it lives in
//! memory. DuckDB calls block, so each statement runs on the blocking pool.

use async_trait::async_trait;
use dbcompare_core::config::DuckDbConfig;
use dbcompare_core::row::format_timestamp;
use dbcompare_core::{BenchError, DatabaseKind, Result};
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::{Connector, Handle, QueryOutput, Statement, TABLE_NAME};

/// Path value that selects an in-memory database.
pub const IN_MEMORY: &str = ":memory:";

fn op_err(e: impl std::fmt::Display) -> BenchError {
    BenchError::operation(DatabaseKind::DuckDb, e.to_string())
}

fn conn_err(e: impl std::fmt::Display) -> BenchError {
    BenchError::connection(DatabaseKind::DuckDb, e.to_string())
}

/// Connector for an embedded DuckDB database.
pub struct DuckDbConnector {
    config: DuckDbConfig,
    root: Mutex<Option<Connection>>,
}

impl DuckDbConnector {
    /// Create a connector; the database is opened on first connect.
    pub fn new(config: DuckDbConfig) -> Self {
        Self {
            config,
            root: Mutex::new(None),
        }
    }

    fn open(&self) -> Result<Connection> {
        let conn = if self.config.database_path == IN_MEMORY {
            Connection::open_in_memory().map_err(conn_err)?
        } else {
            let path = Path::new(&self.config.database_path);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open(path).map_err(conn_err)?
        };

        conn.execute_batch(&format!(
            "SET memory_limit = '{}'; SET threads = {};",
            self.config.memory_limit.replace('\'', "''"),
            self.config.threads
        ))
        .map_err(conn_err)?;

        info!(path = %self.config.database_path, "opened DuckDB database");
        Ok(conn)
    }
}

#[async_trait]
impl Connector for DuckDbConnector {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::DuckDb
    }

    async fn connect(&self) -> Result<Box<dyn Handle>> {
        let mut root = self
            .root
            .lock()
            .map_err(|_| conn_err("connector lock poisoned"))?;
        if root.is_none() {
            *root = Some(self.open()?);
        }
        let conn = match root.as_ref() {
            Some(conn) => conn.try_clone().map_err(conn_err)?,
            None => return Err(conn_err("database not open")),
        };
        Ok(Box::new(DuckDbHandle { conn: Some(conn) }))
    }
}

/// A connection to the connector's database.
pub struct DuckDbHandle {
    conn: Option<Connection>,
}

#[async_trait]
impl Handle for DuckDbHandle {
    async fn execute(&mut self, statement: &Statement) -> Result<QueryOutput> {
        let conn = self.conn.take().ok_or_else(|| op_err("handle is closed"))?;
        let statement = statement.clone();

        let (conn, output) = tokio::task::spawn_blocking(move || {
            let output = run_statement(&conn, &statement);
            (conn, output)
        })
        .await
        .map_err(op_err)?;

        self.conn = Some(conn);
        output
    }

    async fn close(&mut self) -> Result<()> {
        if self.conn.take().is_some() {
            debug!("DuckDB handle closed");
        }
        Ok(())
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn count_rows(conn: &Connection, sql: &str, params: &[&dyn duckdb::ToSql]) -> Result<u64> {
    let mut stmt = conn.prepare(sql).map_err(op_err)?;
    let mut rows = stmt.query(params).map_err(op_err)?;
    let mut count = 0;
    while rows.next().map_err(op_err)?.is_some() {
        count += 1;
    }
    Ok(count)
}

fn first_column(conn: &Connection, sql: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql).map_err(op_err)?;
    let values = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(op_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(op_err)?;
    Ok(values)
}

fn run_statement(conn: &Connection, statement: &Statement) -> Result<QueryOutput> {
    match statement {
        Statement::CreateTable => {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
                    id VARCHAR,
                    timestamp TIMESTAMP,
                    user_id INTEGER,
                    value FLOAT,
                    category VARCHAR,
                    tags VARCHAR[],
                    metadata VARCHAR
                );"
            ))
            .map_err(op_err)?;
            Ok(QueryOutput::default())
        }
        // Filters are served by zone maps; no secondary index is built.
        Statement::CreateIndex(_) => Ok(QueryOutput::default()),
        Statement::LoadDataset(path) => {
            let path = path.to_str().ok_or_else(|| {
                BenchError::Dataset(format!("dataset path is not UTF-8: {}", path.display()))
            })?;
            let loaded = conn
                .execute(
                    &format!(
                        "INSERT INTO {TABLE_NAME}
                         SELECT id, timestamp, user_id, value, category, tags, metadata
                         FROM read_json({}, format = 'newline_delimited', columns = {{
                             id: 'VARCHAR', timestamp: 'TIMESTAMP', user_id: 'INTEGER',
                             value: 'FLOAT', category: 'VARCHAR', tags: 'VARCHAR[]',
                             metadata: 'VARCHAR'
                         }})",
                        quote_literal(path)
                    ),
                    [],
                )
                .map_err(op_err)?;
            Ok(QueryOutput::rows(loaded as u64))
        }
        Statement::SampleIds { limit } => Ok(QueryOutput::values(first_column(
            conn,
            &format!("SELECT id FROM {TABLE_NAME} LIMIT {limit}"),
        )?)),
        Statement::SampleCategories { limit } => Ok(QueryOutput::values(first_column(
            conn,
            &format!(
                "SELECT DISTINCT category FROM {TABLE_NAME} \
                 WHERE category IS NOT NULL LIMIT {limit}"
            ),
        )?)),
        Statement::PointLookup { id } => Ok(QueryOutput::rows(count_rows(
            conn,
            &format!("SELECT * FROM {TABLE_NAME} WHERE id = ?"),
            params![id],
        )?)),
        Statement::RangeScan {
            min_user_id,
            max_user_id,
        } => Ok(QueryOutput::rows(count_rows(
            conn,
            &format!("SELECT * FROM {TABLE_NAME} WHERE user_id >= ? AND user_id <= ?"),
            params![*min_user_id, *max_user_id],
        )?)),
        Statement::CategoryAggregate { category } => Ok(QueryOutput::rows(count_rows(
            conn,
            &format!(
                "SELECT category, COUNT(*) AS count, AVG(value) AS avg_value,
                        MIN(value) AS min_value, MAX(value) AS max_value
                 FROM {TABLE_NAME}
                 WHERE category = ?
                 GROUP BY category"
            ),
            params![category],
        )?)),
        Statement::Insert(row) => {
            let tags = serde_json::to_string(&row.tags).map_err(op_err)?;
            let inserted = conn
                .execute(
                    &format!(
                        "INSERT INTO {TABLE_NAME} VALUES \
                         (?, CAST(? AS TIMESTAMP), ?, ?, ?, from_json(?, '[\"VARCHAR\"]'), ?)"
                    ),
                    params![
                        row.id,
                        row.timestamp,
                        row.user_id,
                        row.value,
                        row.category,
                        tags,
                        row.metadata
                    ],
                )
                .map_err(op_err)?;
            Ok(QueryOutput::rows(inserted as u64))
        }
        Statement::UpdateValue {
            id,
            value,
            timestamp,
        } => {
            let updated = conn
                .execute(
                    &format!(
                        "UPDATE {TABLE_NAME} SET value = ?, timestamp = CAST(? AS TIMESTAMP) \
                         WHERE id = ?"
                    ),
                    params![*value, format_timestamp(timestamp), id],
                )
                .map_err(op_err)?;
            Ok(QueryOutput::rows(updated as u64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IndexedColumn;
    use chrono::Utc;
    use dbcompare_core::schema::default_columns;
    use dbcompare_core::{BenchmarkRow, RowGenerator};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn in_memory() -> DuckDbConnector {
        DuckDbConnector::new(DuckDbConfig {
            database_path: IN_MEMORY.to_string(),
            memory_limit: "512MB".to_string(),
            threads: 1,
            ..DuckDbConfig::default()
        })
    }

    fn sample_row(id: &str, user_id: i32, category: &str) -> BenchmarkRow {
        BenchmarkRow {
            id: id.to_string(),
            timestamp: "2024-03-01 12:00:00.000000".to_string(),
            user_id,
            value: 10.0,
            category: category.to_string(),
            tags: vec!["tag_1".to_string(), "tag,2".to_string()],
            metadata: r#"{"key":"value_1"}"#.to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_and_query_generated_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.jsonl");
        RowGenerator::new(default_columns(), Some(11))
            .write_dataset(250, &path, |_| {})
            .unwrap();

        let connector = in_memory();
        let mut handle = connector.connect().await.unwrap();
        handle.execute(&Statement::CreateTable).await.unwrap();
        let loaded = handle.execute(&Statement::LoadDataset(path)).await.unwrap();
        assert_eq!(loaded.row_count, 250);

        let ids = handle
            .execute(&Statement::SampleIds { limit: 20 })
            .await
            .unwrap();
        assert_eq!(ids.values.len(), 20);

        let hit = handle
            .execute(&Statement::PointLookup {
                id: ids.values[0].clone(),
            })
            .await
            .unwrap();
        assert_eq!(hit.row_count, 1);

        let all = handle
            .execute(&Statement::RangeScan {
                min_user_id: 1,
                max_user_id: 1_000_000,
            })
            .await
            .unwrap();
        assert_eq!(all.row_count, 250);

        let categories = handle
            .execute(&Statement::SampleCategories { limit: 100 })
            .await
            .unwrap();
        assert!(!categories.values.is_empty());
        let grouped = handle
            .execute(&Statement::CategoryAggregate {
                category: categories.values[0].clone(),
            })
            .await
            .unwrap();
        assert_eq!(grouped.row_count, 1);
    }

    #[tokio::test]
    async fn test_handles_share_database() {
        let connector = in_memory();
        let mut writer = connector.connect().await.unwrap();
        let mut reader = connector.connect().await.unwrap();

        writer.execute(&Statement::CreateTable).await.unwrap();
        writer
            .execute(&Statement::CreateIndex(IndexedColumn::UserId))
            .await
            .unwrap();
        writer
            .execute(&Statement::Insert(sample_row("row-1", 5, "category_1")))
            .await
            .unwrap();

        let found = reader
            .execute(&Statement::PointLookup { id: "row-1".into() })
            .await
            .unwrap();
        assert_eq!(found.row_count, 1);
    }

    #[tokio::test]
    async fn test_insert_then_update() {
        let connector = in_memory();
        let mut handle = connector.connect().await.unwrap();
        handle.execute(&Statement::CreateTable).await.unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let row = BenchmarkRow::random(&mut rng);
        handle.execute(&Statement::Insert(row.clone())).await.unwrap();

        let updated = handle
            .execute(&Statement::UpdateValue {
                id: row.id.clone(),
                value: 1.0,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();
        assert_eq!(updated.row_count, 1);

        let missing = handle
            .execute(&Statement::UpdateValue {
                id: "does-not-exist".into(),
                value: 1.0,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();
        assert_eq!(missing.row_count, 0);
    }

    #[tokio::test]
    async fn test_closed_handle_rejects_statements() {
        let connector = in_memory();
        let mut handle = connector.connect().await.unwrap();
        handle.close().await.unwrap();
        handle.close().await.unwrap();

        let err = handle.execute(&Statement::CreateTable).await.unwrap_err();
        assert!(matches!(
            err,
            BenchError::Operation {
                database: DatabaseKind::DuckDb,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_table_is_operation_error() {
        let connector = in_memory();
        let mut handle = connector.connect().await.unwrap();
        let err = handle
            .execute(&Statement::SampleIds { limit: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::Operation { .. }));
    }

    #[tokio::test]
    async fn test_file_database_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bench.duckdb");
        let connector = DuckDbConnector::new(DuckDbConfig {
            database_path: path.to_string_lossy().into_owned(),
            threads: 1,
            ..DuckDbConfig::default()
        });
        let mut handle = connector.connect().await.unwrap();
        handle.execute(&Statement::CreateTable).await.unwrap();
        assert!(path.exists());
    }
}
