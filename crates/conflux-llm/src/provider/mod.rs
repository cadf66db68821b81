//! Provider adapters
//!
//! A [`ProviderAdapter`] is the uniform call site for one configured
//! provider. Every adapter is an [`Adapter`] over a [`VendorProtocol`] that
//! knows its family's endpoints, headers and request layout; decoding is
//! shared and selected by [`VendorFamily`].

pub mod anthropic;
pub mod google;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use conflux_config::{ConnectionConfig, OverrideBuckets, ProviderConfig};
use http::HeaderValue;
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::catalog;
use crate::decode::{FamilyDecoder, StreamCallbacks, StreamOutcome, StreamSession, drive_stream};
use crate::error::LlmError;
use crate::fallback::normalize_single;
use crate::params::{OverrideLayers, OverrideSet, resolve_overrides};
use crate::transport::{ResponseShape, Transport, WireRequest};
use crate::types::{ChatRequest, LlmResponse, Message, ModelMetadata, ProviderMetadata, ToolDefinition, VendorFamily};

pub use anthropic::AnthropicProtocol;
pub use google::GoogleProtocol;
pub use openai::OpenAiProtocol;

/// Per-request configuration
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Model identifier
    pub model: String,
    /// Endpoint, credential and timeouts
    pub connection: ConnectionConfig,
    /// Overrides for this request only; highest precedence
    pub overrides: Map<String, Value>,
    /// Persisted override buckets
    pub saved: OverrideBuckets,
    /// Seed the override set with schema defaults
    pub include_defaults: bool,
}

impl RequestConfig {
    /// Config for `model` over `connection` with no overrides
    pub fn new(model: impl Into<String>, connection: ConnectionConfig) -> Self {
        Self {
            model: model.into(),
            connection,
            ..Self::default()
        }
    }

    /// Config for `model` using a configured provider's connection and saved overrides
    pub fn from_provider(model: impl Into<String>, provider: &ProviderConfig) -> Result<Self, LlmError> {
        let connection = provider
            .connection()
            .map_err(|e| LlmError::Config(format!("{e:#}")))?;
        Ok(Self {
            saved: provider.overrides.clone(),
            ..Self::new(model, connection)
        })
    }

    /// Add one request override
    #[must_use]
    pub fn with_override(mut self, key: impl Into<String>, value: Value) -> Self {
        self.overrides.insert(key.into(), value);
        self
    }

    /// Merge every override layer against `model`'s schema
    pub fn resolve(&self, model: &ModelMetadata) -> OverrideSet {
        let layers = OverrideLayers {
            legacy_custom: Some(&self.saved.custom),
            builtin: Some(&self.saved.builtin),
            request: Some(&self.overrides),
        };
        resolve_overrides(&model.parameters, layers, self.include_defaults)
    }
}

/// Family-specific wire knowledge of one provider
pub trait VendorProtocol: Send + Sync {
    /// Static description of the provider
    fn metadata(&self) -> &ProviderMetadata;

    /// Whether `connection` must carry an API key
    fn requires_credential(&self, connection: &ConnectionConfig) -> bool {
        let _ = connection;
        self.metadata().requires_api_key
    }

    /// Build the chat request for `model`
    fn chat_request(
        &self,
        request: ChatRequest<'_>,
        model: &ModelMetadata,
        connection: &ConnectionConfig,
    ) -> Result<WireRequest, LlmError>;

    /// Build the model listing request
    fn models_request(&self, connection: &ConnectionConfig) -> Result<WireRequest, LlmError>;

    /// Parse a model listing body into bare model entries
    fn parse_models(&self, body: &Value) -> Result<Vec<ModelMetadata>, LlmError>;
}

/// Uniform entry point for one provider
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider description
    fn provider(&self) -> &ProviderMetadata;

    /// Static model list
    fn models(&self) -> Vec<ModelMetadata>;

    /// Model list fetched from the vendor, falling back to [`Self::models`]
    /// on any failure
    async fn models_async(&self, connection: &ConnectionConfig) -> Vec<ModelMetadata>;

    /// Single-shot request
    async fn send_message(&self, messages: &[Message], config: &RequestConfig) -> Result<LlmResponse, LlmError>;

    /// Streaming request
    ///
    /// Configuration errors are returned before any callback fires. Every
    /// later failure reaches `on_error` and is returned as well.
    async fn send_message_stream(
        &self,
        messages: &[Message],
        config: &RequestConfig,
        callbacks: &mut dyn StreamCallbacks,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, LlmError> {
        self.send_message_stream_with_tools(messages, config, &[], callbacks, cancel)
            .await
    }

    /// Streaming request offering `tools`; completed calls reach `on_tool_call`
    async fn send_message_stream_with_tools(
        &self,
        messages: &[Message],
        config: &RequestConfig,
        tools: &[ToolDefinition],
        callbacks: &mut dyn StreamCallbacks,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, LlmError>;
}

/// [`ProviderAdapter`] over one vendor protocol and a transport
pub struct Adapter<P> {
    protocol: P,
    transport: Arc<dyn Transport>,
    inline_reasoning: bool,
}

impl<P: VendorProtocol> Adapter<P> {
    /// Adapter with inline `<think>` extraction enabled
    pub fn new(protocol: P, transport: Arc<dyn Transport>) -> Self {
        Self {
            protocol,
            transport,
            inline_reasoning: true,
        }
    }

    /// Toggle inline reasoning tag extraction on visible text
    #[must_use]
    pub const fn with_inline_reasoning(mut self, enabled: bool) -> Self {
        self.inline_reasoning = enabled;
        self
    }

    fn family(&self) -> VendorFamily {
        self.protocol.metadata().family
    }

    fn provider_id(&self) -> &str {
        &self.protocol.metadata().id
    }

    /// Validate, resolve overrides and build the wire request
    fn prepare(
        &self,
        messages: &[Message],
        config: &RequestConfig,
        tools: &[ToolDefinition],
        stream: bool,
    ) -> Result<WireRequest, LlmError> {
        if messages.is_empty() {
            return Err(LlmError::EmptyMessages);
        }
        if self.protocol.requires_credential(&config.connection) && api_key(&config.connection).is_none() {
            return Err(LlmError::MissingCredential {
                provider: self.provider_id().to_owned(),
            });
        }

        let model = catalog::model_metadata(self.family(), &config.model);
        let params = config.resolve(&model).emitted(&model.parameters);
        tracing::debug!(
            provider = %self.provider_id(),
            model = %config.model,
            params = ?params.keys().collect::<Vec<_>>(),
            stream,
            "prepared request"
        );

        let request = ChatRequest {
            model: &config.model,
            messages,
            tools,
            params,
            stream,
        };
        self.protocol.chat_request(request, &model, &config.connection)
    }

    fn session(&self, config: &RequestConfig) -> StreamSession {
        StreamSession::new(config.model.as_str(), self.inline_reasoning)
    }
}

#[async_trait]
impl<P: VendorProtocol> ProviderAdapter for Adapter<P> {
    fn provider(&self) -> &ProviderMetadata {
        self.protocol.metadata()
    }

    fn models(&self) -> Vec<ModelMetadata> {
        catalog::static_models(self.family())
    }

    async fn models_async(&self, connection: &ConnectionConfig) -> Vec<ModelMetadata> {
        let provider = self.provider_id();
        if self.protocol.requires_credential(connection) && api_key(connection).is_none() {
            tracing::warn!(provider = %provider, "no API key for model listing, using static list");
            return self.models();
        }

        let fetched = match self.protocol.models_request(connection) {
            Ok(request) => self.transport.send_once(request).await,
            Err(e) => Err(e),
        };

        let discovered = match fetched {
            Ok(ResponseShape::Json(body)) => self.protocol.parse_models(&body),
            Ok(other) => Err(LlmError::parse("model list is not a JSON object", &format!("{other:?}"))),
            Err(e) => Err(e),
        };

        match discovered {
            Ok(models) if !models.is_empty() => {
                tracing::debug!(provider = %provider, count = models.len(), "discovered models");
                merge_with_static(models, self.family())
            }
            Ok(_) => {
                tracing::warn!(provider = %provider, "vendor listed no models, using static list");
                self.models()
            }
            Err(e) => {
                tracing::warn!(provider = %provider, error = %e, "failed to discover models, using static list");
                self.models()
            }
        }
    }

    async fn send_message(&self, messages: &[Message], config: &RequestConfig) -> Result<LlmResponse, LlmError> {
        let request = self.prepare(messages, config, &[], false)?;
        let shape = self.transport.send_once(request).await?;
        normalize_single(shape, FamilyDecoder::new(self.family()), self.session(config)).await
    }

    async fn send_message_stream_with_tools(
        &self,
        messages: &[Message],
        config: &RequestConfig,
        tools: &[ToolDefinition],
        callbacks: &mut dyn StreamCallbacks,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, LlmError> {
        let request = self.prepare(messages, config, tools, true)?;

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
            opened = self.transport.open_stream(request) => opened,
        };
        let chunks = match opened {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::error!(provider = %self.provider_id(), error = %e, "failed to open stream");
                callbacks.on_error(&e);
                return Err(e);
            }
        };

        drive_stream(
            chunks,
            FamilyDecoder::new(self.family()),
            self.session(config),
            callbacks,
            cancel,
        )
        .await
    }
}

/// Adapter for a provider of `family` registered under `id`
pub fn build_adapter(
    id: &str,
    family: VendorFamily,
    transport: Arc<dyn Transport>,
    inline_reasoning: bool,
) -> Arc<dyn ProviderAdapter> {
    match family {
        VendorFamily::DeltaChunk => {
            Arc::new(Adapter::new(OpenAiProtocol::new(id), transport).with_inline_reasoning(inline_reasoning))
        }
        VendorFamily::NamedEvent => {
            Arc::new(Adapter::new(AnthropicProtocol::new(id), transport).with_inline_reasoning(inline_reasoning))
        }
        VendorFamily::PartArray => {
            Arc::new(Adapter::new(GoogleProtocol::new(id), transport).with_inline_reasoning(inline_reasoning))
        }
    }
}

/// Metadata for a provider registered under `id`, based on its family's
pub(crate) fn named_metadata(id: &str, family: VendorFamily) -> ProviderMetadata {
    let mut metadata = catalog::provider_metadata(family);
    if metadata.id != id {
        id.clone_into(&mut metadata.name);
        id.clone_into(&mut metadata.id);
    }
    metadata
}

/// Prefer the static entry for every discovered id
fn merge_with_static(discovered: Vec<ModelMetadata>, family: VendorFamily) -> Vec<ModelMetadata> {
    let known = catalog::static_models(family);
    discovered
        .into_iter()
        .map(|model| match known.iter().find(|k| k.id == model.id) {
            Some(entry) => entry.clone(),
            None => ModelMetadata {
                parameters: catalog::default_schema(family),
                ..model
            },
        })
        .collect()
}

/// The configured API key, treating an empty key as absent
pub(crate) fn api_key(connection: &ConnectionConfig) -> Option<&str> {
    connection
        .api_key
        .as_ref()
        .map(ExposeSecret::expose_secret)
        .filter(|key| !key.is_empty())
}

/// Header value that is redacted from debug output
pub(crate) fn secret_header(value: &str) -> Result<HeaderValue, LlmError> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|_| LlmError::Config("API key contains characters not allowed in a header".to_owned()))?;
    header.set_sensitive(true);
    Ok(header)
}

/// Join `path` onto the connection's base URL or `default_base`
pub(crate) fn endpoint(connection: &ConnectionConfig, default_base: &str, path: &str) -> Result<Url, LlmError> {
    let base = connection
        .base_url
        .as_ref()
        .map_or(default_base, Url::as_str)
        .trim_end_matches('/');
    Url::parse(&format!("{base}/{path}")).map_err(|e| LlmError::Config(format!("invalid endpoint {base}/{path}: {e}")))
}

/// Serialize a wire body
pub(crate) fn to_body<T: serde::Serialize>(body: &T) -> Result<Value, LlmError> {
    serde_json::to_value(body).map_err(|e| LlmError::Internal(e.into()))
}
