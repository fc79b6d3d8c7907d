// Copyright 2025 DB Compare Contributors
// SPDX-License-Identifier: Apache-2.0

//! Identifiers for the database engines under comparison.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The engines a benchmark can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    /// Distributed wide-column store
    Scylla,
    /// Embedded analytical engine
    DuckDb,
}

impl DatabaseKind {
    /// Every engine, in the order suites run them.
    pub const ALL: [DatabaseKind; 2] = [DatabaseKind::Scylla, DatabaseKind::DuckDb];

    /// Lowercase identifier used in file names and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scylla => "scylla",
            Self::DuckDb => "duckdb",
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scylla" | "scylladb" => Ok(Self::Scylla),
            "duckdb" => Ok(Self::DuckDb),
            other => Err(format!("unsupported database type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("ScyllaDB".parse::<DatabaseKind>().unwrap(), DatabaseKind::Scylla);
        assert_eq!("duckdb".parse::<DatabaseKind>().unwrap(), DatabaseKind::DuckDb);
        assert!("postgres".parse::<DatabaseKind>().is_err());
        assert_eq!(DatabaseKind::DuckDb.to_string(), "duckdb");
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&DatabaseKind::Scylla).unwrap();
        assert_eq!(json, "\"scylla\"");
        let kind: DatabaseKind = serde_json::from_str("\"duckdb\"").unwrap();
        assert_eq!(kind, DatabaseKind::DuckDb);
    }
}
