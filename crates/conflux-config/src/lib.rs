//! Declarative configuration for conflux
//!
//! A single TOML file describes the configured providers (their vendor
//! family, connection settings and persisted parameter overrides), the
//! registry cache and logging.

#![allow(clippy::must_use_candidate)]

mod connection;
mod env;
mod loader;
pub mod llm;
pub mod telemetry;

use serde::Deserialize;

pub use connection::ConnectionConfig;
pub use llm::*;
pub use telemetry::{LogFormat, TelemetryConfig};

/// Top-level conflux configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Configured providers keyed by identifier
    #[serde(default)]
    pub providers: indexmap::IndexMap<String, ProviderConfig>,
    /// Adapter registry settings
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
