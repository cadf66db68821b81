//! Delta-chunk family decoder (`OpenAI` chat completions)

use serde::Deserialize;
use serde_json::Value;

use super::{BodyShape, StreamCallbacks, StreamSession};
use crate::accumulator::ToolCallDelta;
use crate::error::LlmError;
use crate::protocol::openai::{Completion, CompletionChunk, ErrorEnvelope, TokenUsage};
use crate::types::Usage;

/// Decoder for delta-JSON chunks
///
/// `delta.reasoning_content` is a native reasoning channel; `delta.content`
/// goes through inline tag extraction; `delta.tool_calls` feed the
/// accumulator by index. Only the first choice is surfaced.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeltaChunkDecoder;

impl DeltaChunkDecoder {
    /// Fold one streamed chunk
    pub fn decode(
        &self,
        chunk: &Value,
        session: &mut StreamSession,
        callbacks: &mut dyn StreamCallbacks,
    ) -> Result<(), LlmError> {
        check_error(chunk)?;

        let chunk = match CompletionChunk::deserialize(chunk) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable delta chunk");
                return Ok(());
            }
        };

        session.set_model(&chunk.model);
        if let Some(usage) = chunk.usage {
            session.set_usage(usage_from(usage));
        }

        for choice in chunk.choices.into_iter().filter(|c| c.index == 0) {
            let delta = choice.delta;
            if let Some(reasoning) = delta.reasoning_content {
                session.reasoning(&reasoning, callbacks);
            }
            if let Some(content) = delta.content {
                session.text(&content, callbacks);
            }
            for call in delta.tool_calls.into_iter().flatten() {
                let (name, arguments) = call.function.map(|f| (f.name, f.arguments)).unwrap_or_default();
                session.tool_delta(
                    ToolCallDelta {
                        index: call.index,
                        id: call.id,
                        name,
                        arguments,
                    },
                    callbacks,
                );
            }
            if let Some(reason) = choice.finish_reason {
                session.set_finish_reason(reason);
            }
        }

        Ok(())
    }

    /// Fold a complete chat completion body
    pub fn decode_message(
        &self,
        body: &Value,
        session: &mut StreamSession,
        callbacks: &mut dyn StreamCallbacks,
    ) -> Result<(), LlmError> {
        check_error(body)?;
        let response = Completion::deserialize(body).map_err(|e| LlmError::parse(e.to_string(), &body.to_string()))?;

        session.set_model(&response.model);
        if let Some(usage) = response.usage {
            session.set_usage(usage_from(usage));
        }

        let Some(choice) = response.choices.into_iter().next() else {
            return Ok(());
        };
        let message = choice.message;
        if let Some(reasoning) = message.reasoning_content {
            session.reasoning(&reasoning, callbacks);
        }
        if let Some(content) = message.content {
            session.text(&content, callbacks);
        }
        for (index, call) in message.tool_calls.into_iter().flatten().enumerate() {
            session.tool_delta(
                ToolCallDelta {
                    index: u32::try_from(index).unwrap_or(u32::MAX),
                    id: Some(call.id),
                    name: Some(call.function.name),
                    arguments: Some(call.function.arguments),
                },
                callbacks,
            );
        }
        if let Some(reason) = choice.finish_reason {
            session.set_finish_reason(reason);
        }

        Ok(())
    }

    /// Complete responses carry `choices[].message`, chunks `choices[].delta`
    pub fn classify(body: &Value) -> BodyShape {
        if body.get("error").is_some() {
            return BodyShape::Chunk;
        }
        match body.pointer("/choices/0") {
            Some(choice) if choice.get("message").is_some() => BodyShape::Message,
            Some(choice) if choice.get("delta").is_some() || choice.get("finish_reason").is_some() => BodyShape::Chunk,
            _ => BodyShape::Unrecognized,
        }
    }
}

fn check_error(value: &Value) -> Result<(), LlmError> {
    if value.get("error").is_some()
        && let Ok(error) = ErrorEnvelope::deserialize(value)
    {
        return Err(LlmError::Stream(error.error.message));
    }
    Ok(())
}

const fn usage_from(usage: TokenUsage) -> Usage {
    Usage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}
