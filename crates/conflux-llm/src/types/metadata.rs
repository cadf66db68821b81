use conflux_config::ProviderType;
use serde::{Deserialize, Serialize};

use crate::params::ParameterSchemaEntry;

/// Structurally distinct wire protocol shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorFamily {
    /// Delta-JSON chunks with index-keyed tool-call fragments
    DeltaChunk,
    /// Named SSE events with content blocks
    NamedEvent,
    /// Candidate part arrays with a per-part thought flag
    PartArray,
}

impl From<ProviderType> for VendorFamily {
    fn from(provider_type: ProviderType) -> Self {
        match provider_type {
            ProviderType::Openai => Self::DeltaChunk,
            ProviderType::Anthropic => Self::NamedEvent,
            ProviderType::Google => Self::PartArray,
        }
    }
}

/// Static description of a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Registry identifier (lowercase)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Wire protocol family
    pub family: VendorFamily,
    /// Base URL used when the connection does not override it
    pub default_base_url: String,
    /// Whether requests fail fast without an API key
    pub requires_api_key: bool,
}

/// Description of one model and its tunable parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model identifier sent to the vendor
    pub id: String,
    /// Display name
    pub name: String,
    /// Context window in tokens, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u32>,
    /// Whether the model accepts tool definitions
    pub supports_tools: bool,
    /// Whether the model emits reasoning text
    pub supports_reasoning: bool,
    /// Declared parameter schema
    #[serde(default)]
    pub parameters: Vec<ParameterSchemaEntry>,
}

impl ModelMetadata {
    /// Minimal metadata for a model discovered at runtime
    pub fn discovered(id: impl Into<String>, parameters: Vec<ParameterSchemaEntry>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            context_window: None,
            supports_tools: true,
            supports_reasoning: false,
            parameters,
        }
    }
}
