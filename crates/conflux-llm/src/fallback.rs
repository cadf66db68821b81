//! Recovery of single-shot responses that did not arrive as one JSON object
//!
//! Vendors sometimes answer a non-streaming request with a raw event-stream
//! body or keep streaming regardless of the request flag. Both are folded
//! through the family decoder so the caller still receives one response.

use futures_util::StreamExt;
use serde_json::Value;

use crate::client::DONE_SENTINEL;
use crate::decode::{BodyShape, Discard, FamilyDecoder, StreamSession};
use crate::error::LlmError;
use crate::transport::ResponseShape;
use crate::types::LlmResponse;

/// Parse a raw event-stream body into chunk objects
///
/// Multi-line `data:` fields of one event are joined with newlines. The
/// `[DONE]` sentinel, comments and unparseable payloads are skipped.
pub fn parse_raw_event_stream(raw: &str) -> Vec<Value> {
    let mut chunks = Vec::new();
    let mut data: Vec<&str> = Vec::new();

    let mut flush = |data: &mut Vec<&str>| {
        if data.is_empty() {
            return;
        }
        let payload = data.join("\n");
        data.clear();
        let payload = payload.trim();
        if payload.is_empty() || payload == DONE_SENTINEL {
            return;
        }
        match serde_json::from_str::<Value>(payload) {
            Ok(value) => chunks.push(value),
            Err(e) => tracing::debug!(error = %e, "skipping unparseable event payload"),
        }
    };

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            flush(&mut data);
        } else if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    flush(&mut data);

    chunks
}

/// Turn whatever a single-shot request produced into one response
///
/// Fails with a parse error quoting the payload when nothing usable was
/// recovered, and with the stream's own error when a forced stream fails.
pub async fn normalize_single(
    shape: ResponseShape,
    mut decoder: FamilyDecoder,
    mut session: StreamSession,
) -> Result<LlmResponse, LlmError> {
    let mut callbacks = Discard;

    let payload = match shape {
        ResponseShape::Json(body) => {
            match decoder.classify(&body) {
                BodyShape::Message => decoder.decode_message(&body, &mut session, &mut callbacks)?,
                BodyShape::Chunk => decoder.decode(&body, &mut session, &mut callbacks)?,
                BodyShape::Chunks => {
                    for chunk in body.as_array().into_iter().flatten() {
                        decoder.decode(chunk, &mut session, &mut callbacks)?;
                    }
                }
                BodyShape::Unrecognized => {
                    return Err(LlmError::parse("unrecognized response shape", &body.to_string()));
                }
            }
            body.to_string()
        }
        ResponseShape::Raw(text) => {
            let chunks = parse_raw_event_stream(&text);
            if chunks.is_empty() {
                return Err(LlmError::parse("body is neither JSON nor an event stream", &text));
            }
            tracing::debug!(chunks = chunks.len(), "recovered chunks from raw event-stream body");
            for chunk in &chunks {
                decoder.decode(chunk, &mut session, &mut callbacks)?;
            }
            text
        }
        ResponseShape::Stream(mut chunks) => {
            tracing::debug!("draining forced stream for single-shot request");
            let mut seen = Vec::new();
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk?;
                decoder.decode(&chunk, &mut session, &mut callbacks)?;
                seen.push(chunk);
            }
            Value::Array(seen).to_string()
        }
    };

    let response = session.finish(&mut callbacks);
    if !response.has_output() {
        return Err(LlmError::parse("response contained no content", &payload));
    }
    Ok(response)
}
