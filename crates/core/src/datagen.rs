// Copyright 2025 DB Compare Contributors
// SPDX-License-Identifier: Apache-2.0

//! Synthetic row generation from a [`ColumnSpec`] schema.
//!
//! Every value is drawn independently; the generator only carries its RNG and
//! the reference "now" used for timestamp columns. Seeding the generator makes
//! datasets reproducible.
//!
//! Rows are written as newline-delimited JSON, one object per line keyed by
//! column name.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{BenchError, Result};
use crate::row::format_timestamp;
use crate::schema::{ColumnSpec, ColumnType, ListElement};

/// Rows between progress callbacks in [`RowGenerator::write_ndjson`].
pub const PROGRESS_CHUNK: u64 = 1000;

/// Random row generator.
pub struct RowGenerator {
    columns: Vec<ColumnSpec>,
    rng: StdRng,
    now: DateTime<Utc>,
}

impl RowGenerator {
    /// Create a generator; `seed` of `None` draws from OS entropy.
    pub fn new(columns: Vec<ColumnSpec>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            columns,
            rng,
            now: Utc::now(),
        }
    }

    /// Pin the reference time for timestamp columns.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Draw one value for `column`.
    pub fn value(&mut self, column: &ColumnSpec) -> Value {
        match column.column_type {
            ColumnType::Uuid => {
                let id = uuid::Builder::from_random_bytes(self.rng.gen()).into_uuid();
                Value::String(id.to_string())
            }
            ColumnType::Timestamp => {
                let days_ago = self.rng.gen_range(0..=365);
                Value::String(format_timestamp(&(self.now - Duration::days(days_ago))))
            }
            ColumnType::Int => Value::from(self.rng.gen_range(1..=1_000_000_i64)),
            ColumnType::Float => Value::from(self.rng.gen_range(0.0..1000.0_f64)),
            ColumnType::String => Value::String(format!(
                "category_{}",
                self.rng.gen_range(1..=column.cardinality())
            )),
            ColumnType::List(element) => {
                let length = self.rng.gen_range(0..=column.max_length());
                let items = (0..length)
                    .map(|_| match element {
                        ListElement::String => {
                            Value::String(format!("tag_{}", self.rng.gen_range(1..=100)))
                        }
                        ListElement::Int => Value::from(self.rng.gen_range(1..=100_i64)),
                    })
                    .collect();
                Value::Array(items)
            }
            ColumnType::Json => Value::String(self.json_object(column.max_keys()).to_string()),
        }
    }

    fn json_object(&mut self, max_keys: usize) -> Value {
        let num_keys = self.rng.gen_range(1..=max_keys.max(1));
        let mut object = Map::with_capacity(num_keys);
        for i in 0..num_keys {
            let value = match self.rng.gen_range(0..3) {
                0 => Value::from(self.rng.gen_range(1..=100_i64)),
                1 => {
                    let raw: f64 = self.rng.gen_range(0.0..100.0);
                    Value::from((raw * 100.0).round() / 100.0)
                }
                _ => Value::from(self.rng.gen_range(0..=1_i64)),
            };
            object.insert(format!("key_{i}"), value);
        }
        Value::Object(object)
    }

    /// Generate one row keyed by column name.
    pub fn row(&mut self) -> Map<String, Value> {
        let columns = std::mem::take(&mut self.columns);
        let row = columns
            .iter()
            .map(|column| (column.name.clone(), self.value(column)))
            .collect();
        self.columns = columns;
        row
    }

    /// Write `rows` rows as newline-delimited JSON.
    ///
    /// `on_progress` receives the number of rows written since the previous call.
    pub fn write_ndjson<W: Write>(
        &mut self,
        rows: u64,
        mut out: W,
        mut on_progress: impl FnMut(u64),
    ) -> Result<()> {
        let mut pending = 0;
        for _ in 0..rows {
            let row = self.row();
            serde_json::to_writer(&mut out, &row)
                .map_err(|e| BenchError::Dataset(format!("failed to encode row: {e}")))?;
            out.write_all(b"\n")?;
            pending += 1;
            if pending == PROGRESS_CHUNK {
                on_progress(pending);
                pending = 0;
            }
        }
        if pending > 0 {
            on_progress(pending);
        }
        out.flush()?;
        Ok(())
    }

    /// Write `rows` rows to `path`, creating parent directories.
    pub fn write_dataset(
        &mut self,
        rows: u64,
        path: impl AsRef<Path>,
        on_progress: impl FnMut(u64),
    ) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(path)?;
        self.write_ndjson(rows, BufWriter::new(file), on_progress)?;
        tracing::info!(path = %path.display(), rows, "dataset written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::BenchmarkRow;
    use crate::schema::default_columns;
    use std::io::BufRead;

    #[test]
    fn test_values_respect_bounds() {
        let mut generator = RowGenerator::new(Vec::new(), Some(42));
        let category = ColumnSpec {
            cardinality: Some(3),
            ..ColumnSpec::new("category", ColumnType::String)
        };
        let tags = ColumnSpec {
            max_length: Some(2),
            ..ColumnSpec::new("tags", ColumnType::List(ListElement::Int))
        };
        let metadata = ColumnSpec {
            max_keys: Some(2),
            ..ColumnSpec::new("metadata", ColumnType::Json)
        };

        for _ in 0..200 {
            let value = generator.value(&category);
            let n: u32 = value.as_str().unwrap()["category_".len()..].parse().unwrap();
            assert!((1..=3).contains(&n));

            let list = generator.value(&tags);
            let items = list.as_array().unwrap();
            assert!(items.len() <= 2);
            assert!(items.iter().all(|v| (1..=100).contains(&v.as_i64().unwrap())));

            let encoded = generator.value(&metadata);
            let object: Value = serde_json::from_str(encoded.as_str().unwrap()).unwrap();
            let keys = object.as_object().unwrap().len();
            assert!((1..=2).contains(&keys));

            let int = generator.value(&ColumnSpec::new("user_id", ColumnType::Int));
            assert!((1..=1_000_000).contains(&int.as_i64().unwrap()));
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let now = Utc::now();
        let mut a = RowGenerator::new(default_columns(), Some(9)).with_now(now);
        let mut b = RowGenerator::new(default_columns(), Some(9)).with_now(now);
        assert_eq!(a.row(), b.row());
    }

    #[test]
    fn test_write_dataset_produces_loadable_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/small.jsonl");
        let mut generator = RowGenerator::new(default_columns(), Some(1));
        let mut reported = 0;
        generator
            .write_dataset(2_500, &path, |n| reported += n)
            .unwrap();
        assert_eq!(reported, 2_500);

        let file = fs::File::open(&path).unwrap();
        let lines: Vec<String> = std::io::BufReader::new(file)
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines.len(), 2_500);
        let row: BenchmarkRow = serde_json::from_str(&lines[0]).unwrap();
        assert!(row.uuid().is_ok());
        assert!(row.parsed_timestamp().is_ok());
    }
}
