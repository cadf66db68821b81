//! Request bodies for the Anthropic Messages wire format

use serde_json::Value;

use crate::error::LlmError;
use crate::protocol::anthropic::{MessagesBody, RequestBlock, ThinkingConfig, ToolSpec, Turn, TurnContent};
use crate::types::{ChatRequest, Message, Role, ToolDefinition};

/// Fallback when neither the overrides nor the schema give `max_tokens`
pub const FALLBACK_MAX_TOKENS: u64 = 4096;

/// Build a Messages API body
///
/// System turns are hoisted into the top-level `system` field and tool
/// results become `tool_result` blocks on a user turn. `max_tokens` is
/// required by the API and falls back to `default_max_tokens`.
pub fn build_request(request: ChatRequest<'_>, default_max_tokens: u64) -> Result<MessagesBody, LlmError> {
    let mut system_parts = Vec::new();
    let mut messages: Vec<Turn> = Vec::new();

    for message in request.messages {
        match message.role {
            Role::System => system_parts.push(message.content.as_str()),
            Role::User => messages.push(Turn {
                role: "user",
                content: TurnContent::Text(message.content.clone()),
            }),
            Role::Assistant => messages.push(assistant_turn(message)),
            Role::Tool => {
                let tool_use_id = message
                    .tool_call_id
                    .clone()
                    .ok_or_else(|| LlmError::Config("tool message is missing tool_call_id".to_owned()))?;
                let block = RequestBlock::ToolResult {
                    tool_use_id,
                    content: message.content.clone(),
                };

                // Consecutive tool results share one user turn
                match messages.last_mut() {
                    Some(Turn {
                        role,
                        content: TurnContent::Blocks(blocks),
                    }) if *role == "user" && blocks.iter().all(|b| matches!(b, RequestBlock::ToolResult { .. })) => {
                        blocks.push(block);
                    }
                    _ => messages.push(Turn {
                        role: "user",
                        content: TurnContent::Blocks(vec![block]),
                    }),
                }
            }
        }
    }

    if messages.is_empty() {
        return Err(LlmError::EmptyMessages);
    }

    let mut params = request.params;
    let max_tokens = params
        .remove("max_tokens")
        .and_then(|v| v.as_u64())
        .unwrap_or(default_max_tokens);
    if let Some(stop) = params.remove("stop") {
        params.insert("stop_sequences".to_owned(), stop);
    }
    let thinking = params
        .remove("thinking_budget")
        .and_then(|v| v.as_u64())
        .filter(|budget| *budget > 0)
        .map(|budget_tokens| ThinkingConfig {
            kind: "enabled",
            budget_tokens,
        });

    let tools = (!request.tools.is_empty()).then(|| request.tools.iter().map(tool_spec).collect());

    Ok(MessagesBody {
        model: request.model.to_owned(),
        max_tokens,
        system: (!system_parts.is_empty()).then(|| system_parts.join("\n\n")),
        messages,
        stream: request.stream.then_some(true),
        tools,
        thinking,
        params,
    })
}

fn assistant_turn(message: &Message) -> Turn {
    let calls = message.tool_calls.as_deref().unwrap_or_default();
    if calls.is_empty() {
        return Turn {
            role: "assistant",
            content: TurnContent::Text(message.content.clone()),
        };
    }

    let mut blocks = Vec::with_capacity(calls.len() + 1);
    if !message.content.is_empty() {
        blocks.push(RequestBlock::Text {
            text: message.content.clone(),
        });
    }
    for call in calls {
        let input = call.parsed_arguments().unwrap_or_else(|e| {
            tracing::debug!(id = %call.id, error = %e, "sending unparseable tool arguments as an empty object");
            Value::Object(serde_json::Map::new())
        });
        blocks.push(RequestBlock::ToolUse {
            id: call.id.clone(),
            name: call.function.name.clone(),
            input,
        });
    }

    Turn {
        role: "assistant",
        content: TurnContent::Blocks(blocks),
    }
}

fn tool_spec(tool: &ToolDefinition) -> ToolSpec {
    ToolSpec {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema: tool.parameters.clone(),
    }
}
