use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use crate::ConnectionConfig;

/// Default single-shot request timeout
pub const DEFAULT_TIMEOUT: &str = "60s";

/// Default streaming request timeout
///
/// Streams stay open for the whole generation, so this is much longer
pub const DEFAULT_STREAM_TIMEOUT: &str = "10m";

/// Default lifetime of a cached model list
pub const DEFAULT_MODEL_CACHE_TTL: &str = "10m";

/// Configuration for a single provider
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Wire protocol family spoken by the provider
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Single-shot request timeout (e.g. "60s")
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Streaming request timeout (e.g. "10m")
    #[serde(default = "default_stream_timeout")]
    pub stream_timeout: String,
    /// Split `<think>` blocks embedded in visible text into the reasoning channel
    #[serde(default = "default_inline_reasoning")]
    pub inline_reasoning: bool,
    /// Persisted parameter overrides
    #[serde(default)]
    pub overrides: OverrideBuckets,
}

impl ProviderConfig {
    /// Resolve the connection settings used for each request
    ///
    /// # Errors
    ///
    /// Returns an error if either timeout is not a valid duration
    pub fn connection(&self) -> anyhow::Result<ConnectionConfig> {
        Ok(ConnectionConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            timeout: parse_duration("timeout", &self.timeout)?,
            stream_timeout: parse_duration("stream_timeout", &self.stream_timeout)?,
        })
    }
}

/// Supported wire protocol families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// OpenAI-compatible chat completions (delta chunks)
    Openai,
    /// Anthropic Messages API (named events)
    Anthropic,
    /// Google Generative Language API (part arrays)
    Google,
}

/// Persisted override buckets applied beneath each request's own overrides
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideBuckets {
    /// Overrides for parameters declared in the model schema
    #[serde(default)]
    pub builtin: Map<String, Value>,
    /// Legacy custom overrides for parameters unknown to the schema
    #[serde(default)]
    pub custom: Map<String, Value>,
}

/// Adapter registry configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// How long a fetched model list stays cached (e.g. "10m")
    #[serde(default = "default_model_cache_ttl")]
    pub model_cache_ttl: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            model_cache_ttl: default_model_cache_ttl(),
        }
    }
}

impl RegistryConfig {
    /// Parsed model cache TTL
    ///
    /// # Errors
    ///
    /// Returns an error if the TTL is not a valid duration
    pub fn model_cache_ttl(&self) -> anyhow::Result<Duration> {
        parse_duration("model_cache_ttl", &self.model_cache_ttl)
    }
}

/// Parse a human duration such as "30s" or "5m"
pub(crate) fn parse_duration(field: &str, value: &str) -> anyhow::Result<Duration> {
    duration_str::parse(value).map_err(|e| anyhow::anyhow!("invalid duration for {field} '{value}': {e}"))
}

fn default_timeout() -> String {
    DEFAULT_TIMEOUT.to_owned()
}

fn default_stream_timeout() -> String {
    DEFAULT_STREAM_TIMEOUT.to_owned()
}

fn default_model_cache_ttl() -> String {
    DEFAULT_MODEL_CACHE_TTL.to_owned()
}

const fn default_inline_reasoning() -> bool {
    true
}
