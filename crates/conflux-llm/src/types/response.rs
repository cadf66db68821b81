use serde::{Deserialize, Serialize};

use super::tool::ToolCall;
use crate::error::LlmError;

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens generated in the completion
    pub completion_tokens: u32,
    /// Total tokens (prompt + completion)
    pub total_tokens: u32,
}

impl Usage {
    /// Usage from prompt and completion counts
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Metadata attached to every response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Model that produced the response
    pub model: String,
    /// Vendor-reported reason generation stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// Total tokens billed for the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u32>,
    /// Detailed usage when the vendor reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// A tool call left out of a response because its arguments never parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedToolCall {
    /// Stream index the call was accumulated under
    pub index: u32,
    /// Identifier, possibly empty
    pub id: String,
    /// Function name, possibly empty
    pub name: String,
    /// Raw accumulated argument text
    pub arguments: String,
    /// JSON parser message
    pub reason: String,
}

impl DroppedToolCall {
    /// The parse error scoped to this tool call
    pub fn error(&self) -> LlmError {
        LlmError::MalformedToolArguments {
            id: self.id.clone(),
            name: self.name.clone(),
            message: self.reason.clone(),
        }
    }
}

/// Unified result of one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Visible answer text
    pub content: String,
    /// Reasoning text, absent when the model produced none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Completed tool calls, absent rather than empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Response metadata
    pub metadata: ResponseMetadata,
    /// Tool calls whose arguments were unusable
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped_tool_calls: Vec<DroppedToolCall>,
}

impl LlmResponse {
    /// Assemble a response, normalising empty channels to absent
    pub fn new(content: String, reasoning: String, tool_calls: Vec<ToolCall>, metadata: ResponseMetadata) -> Self {
        Self {
            content,
            reasoning: (!reasoning.is_empty()).then_some(reasoning),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            metadata,
            dropped_tool_calls: Vec::new(),
        }
    }

    /// Whether the response carries anything a caller can use
    pub fn has_output(&self) -> bool {
        !self.content.is_empty() || self.reasoning.is_some() || self.tool_calls.is_some()
    }
}
