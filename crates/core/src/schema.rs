// Copyright 2025 DB Compare Contributors
// SPDX-License-Identifier: Apache-2.0

//! Declarative column schema for synthetic datasets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of distinct values for `string` columns.
pub const DEFAULT_CARDINALITY: u32 = 1000;

/// Default maximum element count for `list<..>` columns.
pub const DEFAULT_MAX_LENGTH: usize = 5;

/// Default maximum key count for `json` columns.
pub const DEFAULT_MAX_KEYS: usize = 5;

/// Element type of a list column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListElement {
    /// `tag_{n}` strings
    String,
    /// Small integers
    Int,
}

/// Supported column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    /// Random v4 UUID rendered as a string
    Uuid,
    /// Point in time within the last year
    Timestamp,
    /// Uniform integer
    Int,
    /// Uniform real
    Float,
    /// Bounded-cardinality categorical string
    String,
    /// Random-length list
    List(ListElement),
    /// Small object with numeric values, stored as a JSON string
    Json,
}

impl TryFrom<String> for ColumnType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let normalized: String = value
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "uuid" => Ok(Self::Uuid),
            "timestamp" => Ok(Self::Timestamp),
            "int" | "integer" => Ok(Self::Int),
            "float" | "double" => Ok(Self::Float),
            "string" | "text" => Ok(Self::String),
            "json" => Ok(Self::Json),
            "list<string>" | "list<text>" => Ok(Self::List(ListElement::String)),
            "list<int>" | "list<integer>" => Ok(Self::List(ListElement::Int)),
            _ => Err(format!("unknown column type: {value}")),
        }
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uuid => "uuid",
            Self::Timestamp => "timestamp",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::List(ListElement::String) => "list<string>",
            Self::List(ListElement::Int) => "list<int>",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// One column of the generated dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name, used as the JSON key of every generated row.
    pub name: String,
    /// Value type and distribution.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Distinct values for `string` columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<u32>,
    /// Maximum length for list columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Maximum key count for `json` columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_keys: Option<usize>,
}

impl ColumnSpec {
    /// Create a column with default bounds.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            cardinality: None,
            max_length: None,
            max_keys: None,
        }
    }

    /// Effective cardinality for `string` columns.
    pub fn cardinality(&self) -> u32 {
        self.cardinality.unwrap_or(DEFAULT_CARDINALITY)
    }

    /// Effective maximum list length.
    pub fn max_length(&self) -> usize {
        self.max_length.unwrap_or(DEFAULT_MAX_LENGTH)
    }

    /// Effective maximum key count for `json` columns.
    pub fn max_keys(&self) -> usize {
        self.max_keys.unwrap_or(DEFAULT_MAX_KEYS)
    }

    /// Check the declared bounds.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("column name must not be empty".to_string());
        }
        if self.cardinality == Some(0) {
            return Err(format!("column `{}`: cardinality must be at least 1", self.name));
        }
        if self.max_keys == Some(0) {
            return Err(format!("column `{}`: max_keys must be at least 1", self.name));
        }
        Ok(())
    }
}

/// The column layout the benchmark table expects.
pub fn default_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("id", ColumnType::Uuid),
        ColumnSpec::new("timestamp", ColumnType::Timestamp),
        ColumnSpec::new("user_id", ColumnType::Int),
        ColumnSpec::new("value", ColumnType::Float),
        ColumnSpec {
            cardinality: Some(100),
            ..ColumnSpec::new("category", ColumnType::String)
        },
        ColumnSpec {
            max_length: Some(5),
            ..ColumnSpec::new("tags", ColumnType::List(ListElement::String))
        },
        ColumnSpec {
            max_keys: Some(5),
            ..ColumnSpec::new("metadata", ColumnType::Json)
        },
    ]
}
