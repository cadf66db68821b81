//! OpenAI-compatible chat completions protocol

use conflux_config::ConnectionConfig;
use http::HeaderMap;
use http::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::Value;

use super::{VendorProtocol, api_key, endpoint, named_metadata, secret_header, to_body};
use crate::catalog::OPENAI_BASE_URL;
use crate::convert::openai::build_request;
use crate::error::LlmError;
use crate::protocol::openai::ModelList;
use crate::transport::WireRequest;
use crate::types::{ChatRequest, ModelMetadata, ProviderMetadata, VendorFamily};

/// Whether the endpoint is the canonical `OpenAI` API rather than a compatible one
fn is_canonical_openai(connection: &ConnectionConfig) -> bool {
    connection
        .base_url
        .as_ref()
        .is_none_or(|url| url.host_str() == Some("api.openai.com"))
}

/// Delta-chunk protocol spoken by `OpenAI` and compatible servers
#[derive(Debug, Clone)]
pub struct OpenAiProtocol {
    metadata: ProviderMetadata,
}

impl OpenAiProtocol {
    /// Protocol for a provider registered under `id`
    pub fn new(id: &str) -> Self {
        Self {
            metadata: named_metadata(id, VendorFamily::DeltaChunk),
        }
    }

    fn headers(connection: &ConnectionConfig) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key(connection) {
            headers.insert(AUTHORIZATION, secret_header(&format!("Bearer {key}"))?);
        }
        Ok(headers)
    }
}

impl VendorProtocol for OpenAiProtocol {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    /// Self-hosted compatible servers usually run without a key
    fn requires_credential(&self, connection: &ConnectionConfig) -> bool {
        is_canonical_openai(connection)
    }

    fn chat_request(
        &self,
        request: ChatRequest<'_>,
        _model: &ModelMetadata,
        connection: &ConnectionConfig,
    ) -> Result<WireRequest, LlmError> {
        let stream = request.stream;
        // Compatible APIs often reject the unsupported stream_options field
        let body = build_request(request, is_canonical_openai(connection))?;
        let url = endpoint(connection, OPENAI_BASE_URL, "chat/completions")?;
        let timeout = if stream {
            connection.stream_timeout
        } else {
            connection.timeout
        };
        Ok(WireRequest::post(url, Self::headers(connection)?, to_body(&body)?, timeout))
    }

    fn models_request(&self, connection: &ConnectionConfig) -> Result<WireRequest, LlmError> {
        let url = endpoint(connection, OPENAI_BASE_URL, "models")?;
        Ok(WireRequest::get(url, Self::headers(connection)?, connection.timeout))
    }

    fn parse_models(&self, body: &Value) -> Result<Vec<ModelMetadata>, LlmError> {
        let list = ModelList::deserialize(body).map_err(|e| LlmError::parse(e.to_string(), &body.to_string()))?;
        Ok(list
            .data
            .into_iter()
            .map(|m| ModelMetadata::discovered(m.id, Vec::new()))
            .collect())
    }
}
