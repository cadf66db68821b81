//! Part-array family decoder (`Gemini` generateContent)

use serde::Deserialize;
use serde_json::Value;

use super::{BodyShape, StreamCallbacks, StreamSession};
use crate::error::LlmError;
use crate::protocol::google::{ErrorEnvelope, FunctionCall, GenerateReply};
use crate::types::{ToolCall, Usage, synthesize_tool_call_id};

/// Decoder for partial-content objects
///
/// Each part either carries text, flagged as reasoning by `thought`, or a
/// complete function call. Text bypasses inline tag extraction; the flag is
/// the only reasoning signal this family uses.
#[derive(Debug, Default, Clone, Copy)]
pub struct PartArrayDecoder;

impl PartArrayDecoder {
    /// Fold one streamed partial response
    pub fn decode(
        &self,
        chunk: &Value,
        session: &mut StreamSession,
        callbacks: &mut dyn StreamCallbacks,
    ) -> Result<(), LlmError> {
        check_error(chunk)?;
        match GenerateReply::deserialize(chunk) {
            Ok(response) => {
                apply(response, session, callbacks);
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable partial response");
                Ok(())
            }
        }
    }

    /// Fold a complete response body
    pub fn decode_message(
        &self,
        body: &Value,
        session: &mut StreamSession,
        callbacks: &mut dyn StreamCallbacks,
    ) -> Result<(), LlmError> {
        check_error(body)?;
        let response =
            GenerateReply::deserialize(body).map_err(|e| LlmError::parse(e.to_string(), &body.to_string()))?;
        apply(response, session, callbacks);
        Ok(())
    }

    /// Streamed and complete bodies share one shape
    pub fn classify(body: &Value) -> BodyShape {
        if body.get("candidates").is_some() || body.get("usageMetadata").is_some() {
            BodyShape::Message
        } else if body.get("error").is_some() {
            BodyShape::Chunk
        } else {
            BodyShape::Unrecognized
        }
    }
}

fn apply(response: GenerateReply, session: &mut StreamSession, callbacks: &mut dyn StreamCallbacks) {
    if let Some(version) = &response.model_version {
        session.set_model(version);
    }
    if let Some(usage) = response.usage_metadata {
        let mut usage_total = Usage::new(usage.prompt_token_count, usage.candidates_token_count);
        if usage.total_token_count > 0 {
            // Includes thought tokens, which the split counts leave out
            usage_total.total_tokens = usage.total_token_count;
        }
        session.set_usage(usage_total);
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return;
    };

    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(call) = part.function_call {
            session.tool_call(tool_call(call), callbacks);
            continue;
        }
        if let Some(text) = part.text {
            if part.thought {
                session.reasoning(&text, callbacks);
            } else {
                session.content(&text, callbacks);
            }
        }
    }

    if let Some(reason) = candidate.finish_reason {
        session.set_finish_reason(reason);
    }
}

fn tool_call(call: FunctionCall) -> ToolCall {
    let id = call.id.filter(|id| !id.is_empty()).unwrap_or_else(synthesize_tool_call_id);
    let arguments = if call.args.is_null() {
        "{}".to_owned()
    } else {
        call.args.to_string()
    };
    ToolCall::new(id, call.name, arguments)
}

fn check_error(value: &Value) -> Result<(), LlmError> {
    if value.get("error").is_some()
        && let Ok(error) = ErrorEnvelope::deserialize(value)
    {
        return Err(LlmError::Stream(error.error.message));
    }
    Ok(())
}
