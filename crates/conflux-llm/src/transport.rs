//! Boundary between the normalization layer and the network
//!
//! A [`Transport`] either performs one request and hands back whatever shape
//! the vendor answered with, or opens a stream of vendor-shaped chunks. It
//! owns timeouts; it never retries.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::Stream;
use http::HeaderMap;
use serde_json::Value;
use url::Url;

use crate::error::LlmError;

/// Ordered sequence of vendor chunk objects
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Value, LlmError>> + Send>>;

/// One outbound request
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// Endpoint
    pub url: Url,
    /// Authentication and protocol headers
    pub headers: HeaderMap,
    /// JSON body; `None` sends a GET
    pub body: Option<Value>,
    /// Deadline for the whole exchange, including the body
    pub timeout: Duration,
}

impl WireRequest {
    /// GET request without a body
    pub fn get(url: Url, headers: HeaderMap, timeout: Duration) -> Self {
        Self {
            url,
            headers,
            body: None,
            timeout,
        }
    }

    /// POST request with a JSON body
    pub fn post(url: Url, headers: HeaderMap, body: Value, timeout: Duration) -> Self {
        Self {
            url,
            headers,
            body: Some(body),
            timeout,
        }
    }
}

/// What a single-shot request produced
pub enum ResponseShape {
    /// A parsed JSON body
    Json(Value),
    /// A body that is not JSON, typically a raw event-stream dump
    Raw(String),
    /// The vendor streamed even though streaming was not requested
    Stream(ChunkStream),
}

impl std::fmt::Debug for ResponseShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Raw(text) => f.debug_tuple("Raw").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Network boundary consumed by the provider adapters
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request
    async fn send_once(&self, request: WireRequest) -> Result<ResponseShape, LlmError>;

    /// Open a stream of vendor chunks
    ///
    /// Fails before yielding anything when the vendor rejects the request.
    async fn open_stream(&self, request: WireRequest) -> Result<ChunkStream, LlmError>;
}
