// Copyright 2025 DB Compare Contributors
// SPDX-License-Identifier: Apache-2.0

//! The fixed row shape of the `benchmark_data` table.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BenchError, Result};

/// Timestamp layout used in dataset files and SQL literals.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// A row of the benchmark table as stored in dataset files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    pub id: String,
    pub timestamp: String,
    pub user_id: i32,
    pub value: f32,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub metadata: String,
}

impl BenchmarkRow {
    /// A fresh row for write operations of the mixed workload.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
        let tags = (0..3)
            .map(|_| format!("tag_{}", rng.gen_range(1..=100)))
            .collect();
        Self {
            id: id.to_string(),
            timestamp: format_timestamp(&Utc::now()),
            user_id: rng.gen_range(1..=1_000_000),
            value: rng.gen_range(0.0..1000.0),
            category: format!("category_{}", rng.gen_range(1..=100)),
            tags,
            metadata: serde_json::json!({ "key": format!("value_{}", rng.gen_range(1..=100)) })
                .to_string(),
        }
    }

    /// Decode one line of a newline-delimited JSON dataset.
    pub fn from_json_line(line: &str) -> Result<Self> {
        serde_json::from_str(line)
            .map_err(|e| BenchError::Dataset(format!("malformed dataset row: {e}")))
    }

    /// Parse the row id as a UUID.
    pub fn uuid(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.id)
            .map_err(|e| BenchError::Dataset(format!("invalid row id `{}`: {}", self.id, e)))
    }

    /// Parse the row timestamp.
    pub fn parsed_timestamp(&self) -> Result<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Render a timestamp the way dataset files store it.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a dataset timestamp. RFC 3339 input is accepted too.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| BenchError::Dataset(format!("invalid timestamp `{value}`: {e}")))
}
