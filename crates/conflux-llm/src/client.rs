//! reqwest-backed [`Transport`]

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::{StreamExt, future};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::error::{LlmError, snippet};
use crate::transport::{ChunkStream, ResponseShape, Transport, WireRequest};

/// Terminal data line sent by delta-chunk vendors
pub const DONE_SENTINEL: &str = "[DONE]";

/// HTTP transport speaking JSON and server-sent events
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Transport with a default client
    pub fn new() -> Self {
        Self::default()
    }

    async fn execute(&self, request: WireRequest) -> Result<reqwest::Response, LlmError> {
        let WireRequest {
            url,
            headers,
            body,
            timeout,
        } = request;
        let host = url.host_str().unwrap_or_default().to_owned();

        let builder = match body {
            Some(body) => self.client.post(url).json(&body),
            None => self.client.get(url),
        };

        let response = builder.headers(headers).timeout(timeout).send().await.map_err(|e| {
            tracing::error!(host = %host, error = %e, "upstream request failed");
            network_error(e, timeout)
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(host = %host, status = %status, "upstream returned error");
            return Err(LlmError::Transport {
                status: status.as_u16(),
                message: vendor_error_message(&body),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_once(&self, request: WireRequest) -> Result<ResponseShape, LlmError> {
        let timeout = request.timeout;
        let response = self.execute(request).await?;

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));
        if is_event_stream {
            tracing::debug!("single-shot request answered with an event stream");
            return Ok(ResponseShape::Stream(sse_chunks(response, timeout)));
        }

        let text = response.text().await.map_err(|e| network_error(e, timeout))?;
        Ok(match serde_json::from_str::<Value>(&text) {
            Ok(value) => ResponseShape::Json(value),
            Err(_) => ResponseShape::Raw(text),
        })
    }

    async fn open_stream(&self, request: WireRequest) -> Result<ChunkStream, LlmError> {
        let timeout = request.timeout;
        let response = self.execute(request).await?;
        Ok(sse_chunks(response, timeout))
    }
}

/// Decode an SSE body into JSON chunks, ending at the `[DONE]` sentinel
fn sse_chunks(response: reqwest::Response, timeout: Duration) -> ChunkStream {
    let chunks = response
        .bytes_stream()
        .eventsource()
        .take_while(|result| future::ready(!matches!(result, Ok(event) if event.data.trim() == DONE_SENTINEL)))
        .filter_map(move |result| {
            let item = match result {
                Ok(event) => {
                    let data = event.data.trim();
                    if data.is_empty() {
                        None
                    } else {
                        match serde_json::from_str::<Value>(data) {
                            Ok(value) => Some(Ok(value)),
                            Err(e) => {
                                tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
                                None
                            }
                        }
                    }
                }
                Err(EventStreamError::Transport(e)) => Some(Err(network_error(e, timeout))),
                Err(e) => Some(Err(LlmError::Stream(e.to_string()))),
            };
            future::ready(item)
        });

    Box::pin(chunks)
}

fn network_error(error: reqwest::Error, timeout: Duration) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout {
            seconds: timeout.as_secs(),
        }
    } else {
        LlmError::Network(error)
    }
}

/// Pull the human-readable message out of a vendor error body
///
/// Understands `{"error":{"message":..}}`, `{"message":..}` and
/// `{"error":".."}`; anything else is quoted as a bounded snippet.
pub fn vendor_error_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_owned();
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let candidates = [
            value.pointer("/error/message"),
            value.get("message"),
            value.get("error"),
        ];
        if let Some(message) = candidates.into_iter().flatten().find_map(Value::as_str) {
            return message.to_owned();
        }
    }

    snippet(trimmed)
}
