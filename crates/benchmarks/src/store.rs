//! In-memory result store for one benchmarking run.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::result::BenchmarkResult;

/// Benchmark name → results, in the order names were first recorded.
///
/// Append-only: results are never replaced or removed during a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultStore {
    entries: Vec<(String, Vec<BenchmarkResult>)>,
}

impl ResultStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `result` under `name`, creating the entry if absent.
    pub fn record(&mut self, name: impl Into<String>, result: BenchmarkResult) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, results)) => results.push(result),
            None => self.entries.push((name, vec![result])),
        }
    }

    /// Results recorded under `name`, in recording order.
    pub fn get(&self, name: &str) -> Option<&[BenchmarkResult]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, results)| results.as_slice())
    }

    /// Iterate over `(name, results)` in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[BenchmarkResult])> {
        self.entries
            .iter()
            .map(|(name, results)| (name.as_str(), results.as_slice()))
    }

    /// Number of distinct benchmark names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ResultStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, results) in &self.entries {
            map.serialize_entry(name, results)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbcompare_core::DatabaseKind;

    fn result(name: &str, database: DatabaseKind, value: f64) -> BenchmarkResult {
        BenchmarkResult::from_durations(name, database, vec![value], 0).unwrap()
    }

    #[test]
    fn test_record_preserves_order() {
        let mut store = ResultStore::new();
        store.record("q2", result("q2", DatabaseKind::Scylla, 0.2));
        store.record("q1", result("q1", DatabaseKind::Scylla, 0.1));
        store.record("q2", result("q2", DatabaseKind::DuckDb, 0.3));

        let names: Vec<&str> = store.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["q2", "q1"]);
        let q2 = store.get("q2").unwrap();
        assert_eq!(q2.len(), 2);
        assert_eq!(q2[0].database, DatabaseKind::Scylla);
        assert_eq!(q2[1].database, DatabaseKind::DuckDb);
        assert!(store.get("q3").is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_json_keeps_insertion_order() {
        let mut store = ResultStore::new();
        store.record("zeta", result("zeta", DatabaseKind::Scylla, 0.2));
        store.record("alpha", result("alpha", DatabaseKind::DuckDb, 0.1));

        let json = serde_json::to_string(&store).unwrap();
        assert!(json.find("zeta").unwrap() < json.find("alpha").unwrap());

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let zeta: Vec<BenchmarkResult> = serde_json::from_value(value["zeta"].clone()).unwrap();
        assert_eq!(zeta, store.get("zeta").unwrap());
    }
}
