//! Request bodies for the `OpenAI` chat completions wire format

use crate::error::LlmError;
use crate::protocol::openai::{
    ChatBody, ChatMessage, FunctionCallBody, FunctionSpec, StreamOptions, ToolCallBody, ToolSpec,
};
use crate::types::{ChatRequest, Message, Role, ToolCall, ToolDefinition};

/// Build a chat completions body
///
/// `include_usage` asks for a trailing usage chunk; only the canonical API
/// accepts the `stream_options` field.
pub fn build_request(request: ChatRequest<'_>, include_usage: bool) -> Result<ChatBody, LlmError> {
    let messages = request
        .messages
        .iter()
        .map(message_to_openai)
        .collect::<Result<Vec<_>, _>>()?;

    let tools = (!request.tools.is_empty()).then(|| request.tools.iter().map(tool_to_openai).collect());

    Ok(ChatBody {
        model: request.model.to_owned(),
        messages,
        stream: request.stream.then_some(true),
        stream_options: (request.stream && include_usage).then_some(StreamOptions { include_usage: true }),
        tools,
        params: request.params,
    })
}

fn message_to_openai(message: &Message) -> Result<ChatMessage, LlmError> {
    let tool_calls = message
        .tool_calls
        .as_ref()
        .filter(|calls| !calls.is_empty())
        .map(|calls| calls.iter().map(tool_call_to_openai).collect());

    let tool_call_id = match message.role {
        Role::Tool => Some(
            message
                .tool_call_id
                .clone()
                .ok_or_else(|| LlmError::Config("tool message is missing tool_call_id".to_owned()))?,
        ),
        _ => None,
    };

    // Assistant turns that only call tools carry no content
    let content = if tool_calls.is_some() && message.content.is_empty() {
        None
    } else {
        Some(message.content.clone())
    };

    Ok(ChatMessage {
        role: message.role.as_str(),
        content,
        tool_calls,
        tool_call_id,
    })
}

fn tool_call_to_openai(call: &ToolCall) -> ToolCallBody {
    ToolCallBody {
        id: call.id.clone(),
        kind: "function",
        function: FunctionCallBody {
            name: call.function.name.clone(),
            arguments: call.function.arguments.clone(),
        },
    }
}

fn tool_to_openai(tool: &ToolDefinition) -> ToolSpec {
    ToolSpec {
        kind: "function",
        function: FunctionSpec {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}
