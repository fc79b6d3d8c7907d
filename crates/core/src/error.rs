// Copyright 2025 DB Compare Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy shared by every dbcompare crate.

use crate::database::DatabaseKind;
use thiserror::Error;

/// Errors that can occur while configuring or running benchmarks.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Missing or invalid configuration key; fatal before any trial starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// External target unreachable.
    #[error("Connection to {database} failed: {message}")]
    Connection {
        database: DatabaseKind,
        message: String,
    },

    /// A single query or write failed.
    #[error("{database} operation failed: {message}")]
    Operation {
        database: DatabaseKind,
        message: String,
    },

    /// Statistics were requested over an unusable duration sequence.
    #[error("Statistics error: {0}")]
    Statistics(String),

    /// A fan-out worker panicked instead of returning an outcome.
    #[error("Worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },

    /// Dataset could not be generated or read.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Results could not be serialized.
    #[error("Export error: {0}")]
    Export(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error that aborted a trial, tagged with the active benchmark.
    #[error("Benchmark `{benchmark}` on {database} aborted: {source}")]
    Trial {
        benchmark: String,
        database: DatabaseKind,
        #[source]
        source: Box<BenchError>,
    },
}

impl BenchError {
    /// Shorthand for an operation failure on `database`.
    pub fn operation(database: DatabaseKind, message: impl Into<String>) -> Self {
        Self::Operation {
            database,
            message: message.into(),
        }
    }

    /// Shorthand for a connection failure on `database`.
    pub fn connection(database: DatabaseKind, message: impl Into<String>) -> Self {
        Self::Connection {
            database,
            message: message.into(),
        }
    }

    /// Attach the active benchmark and database to an error escaping a trial.
    ///
    /// Errors that already carry trial context are returned unchanged.
    pub fn in_trial(self, benchmark: impl Into<String>, database: DatabaseKind) -> Self {
        match self {
            err @ Self::Trial { .. } => err,
            err => Self::Trial {
                benchmark: benchmark.into(),
                database,
                source: Box::new(err),
            },
        }
    }
}

/// Result type for dbcompare operations.
pub type Result<T> = std::result::Result<T, BenchError>;
