use serde_json::{Map, Value};

use super::message::Message;
use super::tool::ToolDefinition;

/// Provider-agnostic request handed to a request builder
///
/// `params` holds the already-resolved override set; builders only map keys
/// onto the vendor's wire layout.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    /// Model identifier
    pub model: &'a str,
    /// Conversation, oldest first
    pub messages: &'a [Message],
    /// Callable tools, empty when tools are not offered
    pub tools: &'a [ToolDefinition],
    /// Parameters to send
    pub params: Map<String, Value>,
    /// Whether the vendor should stream
    pub stream: bool,
}
