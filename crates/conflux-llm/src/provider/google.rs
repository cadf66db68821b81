//! Google Generative Language protocol

use conflux_config::ConnectionConfig;
use http::{HeaderMap, HeaderName};
use serde::Deserialize;
use serde_json::Value;

use super::{VendorProtocol, api_key, endpoint, named_metadata, secret_header, to_body};
use crate::catalog::GOOGLE_BASE_URL;
use crate::convert::google::build_request;
use crate::error::LlmError;
use crate::protocol::google::ModelList;
use crate::transport::WireRequest;
use crate::types::{ChatRequest, ModelMetadata, ProviderMetadata, VendorFamily};

/// Header form of the key; keeps it out of URLs and their logs
const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-goog-api-key");

/// Part-array protocol of `generateContent`
#[derive(Debug, Clone)]
pub struct GoogleProtocol {
    metadata: ProviderMetadata,
}

impl GoogleProtocol {
    /// Protocol for a provider registered under `id`
    pub fn new(id: &str) -> Self {
        Self {
            metadata: named_metadata(id, VendorFamily::PartArray),
        }
    }

    fn headers(connection: &ConnectionConfig) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key(connection) {
            headers.insert(API_KEY_HEADER, secret_header(key)?);
        }
        Ok(headers)
    }
}

impl VendorProtocol for GoogleProtocol {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn chat_request(
        &self,
        request: ChatRequest<'_>,
        model: &ModelMetadata,
        connection: &ConnectionConfig,
    ) -> Result<WireRequest, LlmError> {
        let model_id = request.model.strip_prefix("models/").unwrap_or(request.model);
        let (path, timeout) = if request.stream {
            (
                format!("models/{model_id}:streamGenerateContent?alt=sse"),
                connection.stream_timeout,
            )
        } else {
            (format!("models/{model_id}:generateContent"), connection.timeout)
        };
        let url = endpoint(connection, GOOGLE_BASE_URL, &path)?;

        let body = build_request(request, model.supports_reasoning)?;
        Ok(WireRequest::post(url, Self::headers(connection)?, to_body(&body)?, timeout))
    }

    fn models_request(&self, connection: &ConnectionConfig) -> Result<WireRequest, LlmError> {
        let url = endpoint(connection, GOOGLE_BASE_URL, "models")?;
        Ok(WireRequest::get(url, Self::headers(connection)?, connection.timeout))
    }

    /// Only models that can generate content are chat models
    fn parse_models(&self, body: &Value) -> Result<Vec<ModelMetadata>, LlmError> {
        let list = ModelList::deserialize(body).map_err(|e| LlmError::parse(e.to_string(), &body.to_string()))?;
        Ok(list
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent")
            })
            .map(|m| {
                let id = m.name.strip_prefix("models/").unwrap_or(&m.name);
                let mut model = ModelMetadata::discovered(id, Vec::new());
                if let Some(name) = m.display_name {
                    model.name = name;
                }
                model.context_window = m.input_token_limit;
                model
            })
            .collect())
    }
}
