// Copyright 2025 DB Compare Contributors
// SPDX-License-Identifier: Apache-2.0

//! Logging setup.
//!
//! Instead of installing a process-wide subscriber, callers build a
//! [`Dispatch`] and attach it to the futures that should log through it
//! (see `tracing::instrument::WithSubscriber`).

use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{BenchError, Result};

/// Build a dispatcher from the logging configuration.
///
/// `RUST_LOG`, when set, overrides the configured level.
pub fn build_dispatch(config: &LoggingConfig) -> Result<Dispatch> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            BenchError::Configuration(format!("invalid logging.level `{}`: {}", config.level, e))
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let dispatch = if config.json {
        Dispatch::new(builder.json().finish())
    } else {
        Dispatch::new(builder.finish())
    };
    Ok(dispatch)
}
