#![allow(dead_code)]

pub mod collect;
pub mod mock_vendor;

use std::sync::Arc;

use conflux_config::Config;
use conflux_llm::{AdapterRegistry, HttpTransport};

use mock_vendor::MockVendor;

/// Configuration pointing one provider of each family at `mock`
pub fn config_for(mock: &MockVendor) -> Config {
    let raw = format!(
        r#"
        [registry]
        model_cache_ttl = "1h"

        [providers.openai]
        type = "openai"
        base_url = "{openai}"
        timeout = "5s"
        stream_timeout = "5s"

        [providers.openai.overrides.builtin]
        temperature = 0.7

        [providers.openai.overrides.custom]
        user = "conflux-tests"

        [providers.anthropic]
        type = "anthropic"
        api_key = "ak-test"
        base_url = "{anthropic}"
        timeout = "5s"
        stream_timeout = "5s"

        [providers.google]
        type = "google"
        api_key = "gk-test"
        base_url = "{google}"
        timeout = "5s"
        stream_timeout = "5s"
        "#,
        openai = mock.openai_url(),
        anthropic = mock.anthropic_url(),
        google = mock.google_url(),
    );
    Config::from_toml(&raw).expect("mock configuration is valid")
}

/// Registry over a real HTTP transport for `config`
pub fn registry_for(config: &Config) -> AdapterRegistry {
    AdapterRegistry::from_config(config, Arc::new(HttpTransport::new())).expect("registry builds")
}
