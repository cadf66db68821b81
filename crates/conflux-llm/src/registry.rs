//! Adapter registry and model-list cache

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use conflux_config::{Config, ConnectionConfig};
use dashmap::DashMap;

use crate::error::LlmError;
use crate::provider::{ProviderAdapter, build_adapter};
use crate::transport::Transport;
use crate::types::{ModelMetadata, VendorFamily};

/// Default lifetime of a cached model list
pub const DEFAULT_MODEL_CACHE_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
struct CachedModels {
    models: Vec<ModelMetadata>,
    fetched_at: Instant,
}

/// Maps provider identifiers to adapters
///
/// Identifiers are case-insensitive. The registry owns the only model-list
/// cache; adapters themselves hold no per-request state.
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn ProviderAdapter>>,
    model_cache: DashMap<String, CachedModels>,
    cache_ttl: Duration,
}

impl AdapterRegistry {
    /// Empty registry
    pub fn new(cache_ttl: Duration) -> Self {
        Self {
            adapters: BTreeMap::new(),
            model_cache: DashMap::new(),
            cache_ttl,
        }
    }

    /// Registry with the built-in `openai`, `anthropic` and `google` adapters
    pub fn with_defaults(transport: Arc<dyn Transport>) -> Self {
        let mut registry = Self::new(DEFAULT_MODEL_CACHE_TTL);
        for (id, family) in [
            ("openai", VendorFamily::DeltaChunk),
            ("anthropic", VendorFamily::NamedEvent),
            ("google", VendorFamily::PartArray),
        ] {
            registry.register(id, build_adapter(id, family, transport.clone(), true));
        }
        registry
    }

    /// One adapter per configured provider
    pub fn from_config(config: &Config, transport: Arc<dyn Transport>) -> Result<Self, LlmError> {
        let ttl = config
            .registry
            .model_cache_ttl()
            .map_err(|e| LlmError::Config(format!("{e:#}")))?;

        let mut registry = Self::new(ttl);
        for (id, provider) in &config.providers {
            let family = VendorFamily::from(provider.provider_type);
            tracing::debug!(provider = %id, family = ?family, "registering provider");
            registry.register(
                id,
                build_adapter(&id.to_lowercase(), family, transport.clone(), provider.inline_reasoning),
            );
        }
        Ok(registry)
    }

    /// Add or replace an adapter
    pub fn register(&mut self, id: &str, adapter: Arc<dyn ProviderAdapter>) {
        let key = id.to_lowercase();
        self.model_cache.remove(&key);
        self.adapters.insert(key, adapter);
    }

    /// Adapter registered under `id`, ignoring case
    pub fn get_adapter(&self, id: &str) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
        self.adapters
            .get(&id.to_lowercase())
            .cloned()
            .ok_or_else(|| LlmError::UnknownProvider {
                provider: id.to_owned(),
                available: self.provider_ids().join(", "),
            })
    }

    /// Registered identifiers in sorted order
    pub fn provider_ids(&self) -> Vec<String> {
        self.adapters.keys().cloned().collect()
    }

    /// Model list of `id`, served from cache while fresh
    pub async fn models(&self, id: &str, connection: &ConnectionConfig) -> Result<Vec<ModelMetadata>, LlmError> {
        let adapter = self.get_adapter(id)?;
        let key = id.to_lowercase();

        if let Some(cached) = self.model_cache.get(&key)
            && cached.fetched_at.elapsed() < self.cache_ttl
        {
            tracing::debug!(provider = %key, "model list served from cache");
            return Ok(cached.models.clone());
        }

        let models = adapter.models_async(connection).await;
        self.model_cache.insert(
            key,
            CachedModels {
                models: models.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(models)
    }

    /// Forget every cached model list
    pub fn clear_cache(&self) {
        tracing::debug!(entries = self.model_cache.len(), "clearing model cache");
        self.model_cache.clear();
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("providers", &self.provider_ids())
            .field("cached", &self.model_cache.len())
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{Reply, ScriptedTransport};

    fn model_list(ids: &[&str]) -> Reply {
        let data: Vec<_> = ids.iter().map(|id| json!({"id": id})).collect();
        Reply::Json(json!({ "data": data }))
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = AdapterRegistry::with_defaults(Arc::new(ScriptedTransport::default()));
        assert_eq!(registry.get_adapter("OpenAI").unwrap().provider().id, "openai");
        assert_eq!(registry.get_adapter("GOOGLE").unwrap().provider().id, "google");
    }

    #[test]
    fn unknown_provider_lists_available_ids() {
        let registry = AdapterRegistry::with_defaults(Arc::new(ScriptedTransport::default()));
        let Err(err) = registry.get_adapter("mistral") else {
            panic!("expected an error");
        };
        assert!(matches!(&err, LlmError::UnknownProvider { provider, .. } if provider == "mistral"));
        assert!(err.to_string().contains("anthropic, google, openai"));
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn model_lists_are_cached_until_cleared() {
        let transport = Arc::new(ScriptedTransport::new([
            model_list(&["gpt-4o"]),
            model_list(&["gpt-4o", "gpt-4.1"]),
        ]));
        let mut registry = AdapterRegistry::new(Duration::from_secs(3600));
        registry.register("OpenAI", build_adapter("openai", VendorFamily::DeltaChunk, transport.clone(), true));
        let connection = ConnectionConfig::with_api_key("sk");

        assert_eq!(registry.models("openai", &connection).await.unwrap().len(), 1);
        assert_eq!(registry.models("OPENAI", &connection).await.unwrap().len(), 1);
        assert_eq!(transport.requests().len(), 1);

        registry.clear_cache();
        assert_eq!(registry.models("openai", &connection).await.unwrap().len(), 2);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let transport = Arc::new(ScriptedTransport::new([model_list(&["a"]), model_list(&["a", "b"])]));
        let mut registry = AdapterRegistry::new(Duration::ZERO);
        registry.register("openai", build_adapter("openai", VendorFamily::DeltaChunk, transport.clone(), true));
        let connection = ConnectionConfig::with_api_key("sk");

        registry.models("openai", &connection).await.unwrap();
        let models = registry.models("openai", &connection).await.unwrap();
        assert_eq!(models.len(), 2);
    }

    #[test]
    fn registry_from_config() {
        let config = Config::from_toml(
            r#"
            [registry]
            model_cache_ttl = "30s"

            [providers.Local]
            type = "openai"
            base_url = "http://localhost:11434/v1"
            inline_reasoning = false

            [providers.claude]
            type = "anthropic"
            api_key = "ak"
            "#,
        )
        .unwrap();

        let registry = AdapterRegistry::from_config(&config, Arc::new(ScriptedTransport::default())).unwrap();
        assert_eq!(registry.provider_ids(), ["claude", "local"]);
        assert_eq!(registry.get_adapter("local").unwrap().provider().id, "local");
        assert_eq!(
            registry.get_adapter("claude").unwrap().provider().family,
            VendorFamily::NamedEvent
        );
    }
}
