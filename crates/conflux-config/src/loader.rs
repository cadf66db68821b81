use std::collections::HashSet;
use std::path::Path;

use crate::Config;
use crate::llm::parse_duration;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a referenced environment
    /// variable is missing, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        tracing::debug!(providers = config.providers.len(), "configuration loaded");

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is configured, provider ids collide
    /// case-insensitively, or a duration is invalid or zero
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.providers.is_empty() {
            anyhow::bail!("at least one provider must be configured");
        }

        let mut seen = HashSet::new();
        for (id, provider) in &self.providers {
            if id.trim().is_empty() {
                anyhow::bail!("provider identifiers must not be empty");
            }
            if !seen.insert(id.to_lowercase()) {
                anyhow::bail!("provider '{id}' is configured more than once (identifiers are case-insensitive)");
            }

            let connection = provider
                .connection()
                .map_err(|e| anyhow::anyhow!("provider '{id}': {e}"))?;
            if connection.timeout.is_zero() || connection.stream_timeout.is_zero() {
                anyhow::bail!("provider '{id}': timeouts must be greater than zero");
            }
        }

        parse_duration("registry.model_cache_ttl", &self.registry.model_cache_ttl)?;

        Ok(())
    }
}
