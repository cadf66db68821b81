//! Anthropic Messages protocol

use conflux_config::ConnectionConfig;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::Value;

use super::{VendorProtocol, api_key, endpoint, named_metadata, secret_header, to_body};
use crate::catalog::{ANTHROPIC_BASE_URL, ANTHROPIC_VERSION};
use crate::convert::anthropic::{FALLBACK_MAX_TOKENS, build_request};
use crate::error::LlmError;
use crate::params::lookup;
use crate::protocol::anthropic::ModelList;
use crate::transport::WireRequest;
use crate::types::{ChatRequest, ModelMetadata, ProviderMetadata, VendorFamily};

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");
const VERSION_HEADER: HeaderName = HeaderName::from_static("anthropic-version");

/// Named-event protocol of the Messages API
#[derive(Debug, Clone)]
pub struct AnthropicProtocol {
    metadata: ProviderMetadata,
}

impl AnthropicProtocol {
    /// Protocol for a provider registered under `id`
    pub fn new(id: &str) -> Self {
        Self {
            metadata: named_metadata(id, VendorFamily::NamedEvent),
        }
    }

    fn headers(connection: &ConnectionConfig) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key(connection) {
            headers.insert(API_KEY_HEADER, secret_header(key)?);
        }
        headers.insert(VERSION_HEADER, HeaderValue::from_static(ANTHROPIC_VERSION));
        Ok(headers)
    }
}

/// `max_tokens` is mandatory; take the schema default when overrides leave it out
fn default_max_tokens(model: &ModelMetadata) -> u64 {
    lookup(&model.parameters, "max_tokens")
        .and_then(|entry| entry.default.as_ref())
        .and_then(Value::as_u64)
        .unwrap_or(FALLBACK_MAX_TOKENS)
}

impl VendorProtocol for AnthropicProtocol {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn chat_request(
        &self,
        request: ChatRequest<'_>,
        model: &ModelMetadata,
        connection: &ConnectionConfig,
    ) -> Result<WireRequest, LlmError> {
        let timeout = if request.stream {
            connection.stream_timeout
        } else {
            connection.timeout
        };
        let body = build_request(request, default_max_tokens(model))?;
        let url = endpoint(connection, ANTHROPIC_BASE_URL, "messages")?;
        Ok(WireRequest::post(url, Self::headers(connection)?, to_body(&body)?, timeout))
    }

    fn models_request(&self, connection: &ConnectionConfig) -> Result<WireRequest, LlmError> {
        let url = endpoint(connection, ANTHROPIC_BASE_URL, "models")?;
        Ok(WireRequest::get(url, Self::headers(connection)?, connection.timeout))
    }

    fn parse_models(&self, body: &Value) -> Result<Vec<ModelMetadata>, LlmError> {
        let list =
            ModelList::deserialize(body).map_err(|e| LlmError::parse(e.to_string(), &body.to_string()))?;
        Ok(list
            .data
            .into_iter()
            .map(|m| {
                let mut model = ModelMetadata::discovered(m.id, Vec::new());
                if let Some(name) = m.display_name {
                    model.name = name;
                }
                model
            })
            .collect())
    }
}
