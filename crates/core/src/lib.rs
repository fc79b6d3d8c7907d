// Copyright 2025 DB Compare Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for dbcompare.
//!
//! This crate holds what every other dbcompare crate agrees on:
//!
//! - [`error`] - the [`BenchError`] taxonomy
//! - [`database`] - the [`DatabaseKind`] of each engine under test
//! - [`config`] - YAML configuration with environment overrides
//! - [`schema`] and [`datagen`] - declarative columns and the row generator
//! - [`row`] - the fixed `benchmark_data` row shape
//! - [`logging`] - construction of the logging dispatcher

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod database;
pub mod datagen;
pub mod error;
pub mod logging;
pub mod row;
pub mod schema;

pub use config::{BenchConfig, DegradedIterations, ExportFormat, FailurePolicy};
pub use database::DatabaseKind;
pub use datagen::RowGenerator;
pub use error::{BenchError, Result};
pub use row::BenchmarkRow;
pub use schema::{ColumnSpec, ColumnType};
