//! Request bodies for the Google Generative Language wire format

use std::collections::HashMap;

use convert_case::{Case, Casing};
use serde_json::{Map, Value, json};

use crate::error::LlmError;
use crate::protocol::google::{
    Content, FunctionCallBody, FunctionDeclaration, FunctionResponse, GenerateBody, Part, ToolSpec,
};
use crate::types::{ChatRequest, Message, Role, ToolDefinition};

/// Build a `generateContent` body
///
/// Parameters move into `generationConfig` with camelCase keys; the few whose
/// wire name differs from a plain case change are mapped explicitly.
pub fn build_request(request: ChatRequest<'_>, include_thoughts: bool) -> Result<GenerateBody, LlmError> {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();
    // Function responses are keyed by name, not call id
    let mut call_names: HashMap<&str, &str> = HashMap::new();

    for message in request.messages {
        match message.role {
            Role::System => system_parts.push(Part::text(message.content.clone())),
            Role::User => contents.push(Content {
                role: Some("user"),
                parts: vec![Part::text(message.content.clone())],
            }),
            Role::Assistant => {
                for call in message.tool_calls.iter().flatten() {
                    call_names.insert(call.id.as_str(), call.function.name.as_str());
                }
                contents.push(assistant_content(message));
            }
            Role::Tool => {
                let id = message
                    .tool_call_id
                    .as_deref()
                    .ok_or_else(|| LlmError::Config("tool message is missing tool_call_id".to_owned()))?;
                let name = call_names.get(id).copied().unwrap_or(id);
                let response = serde_json::from_str::<Value>(&message.content)
                    .ok()
                    .filter(Value::is_object)
                    .unwrap_or_else(|| json!({ "result": message.content }));

                contents.push(Content {
                    role: Some("user"),
                    parts: vec![Part {
                        function_response: Some(FunctionResponse {
                            name: name.to_owned(),
                            response,
                        }),
                        ..Part::default()
                    }],
                });
            }
        }
    }

    if contents.is_empty() {
        return Err(LlmError::EmptyMessages);
    }

    let tools = (!request.tools.is_empty()).then(|| {
        vec![ToolSpec {
            function_declarations: request.tools.iter().map(function_declaration).collect(),
        }]
    });

    Ok(GenerateBody {
        contents,
        system_instruction: (!system_parts.is_empty()).then(|| Content {
            role: None,
            parts: system_parts,
        }),
        generation_config: generation_config(request.params, include_thoughts),
        tools,
    })
}

fn generation_config(params: Map<String, Value>, include_thoughts: bool) -> Map<String, Value> {
    let mut config = Map::new();
    let mut thinking = Map::new();

    for (key, value) in params {
        match key.as_str() {
            "max_tokens" => {
                config.insert("maxOutputTokens".to_owned(), value);
            }
            "stop" => {
                config.insert("stopSequences".to_owned(), value);
            }
            "thinking_budget" => {
                thinking.insert("thinkingBudget".to_owned(), value);
            }
            _ => {
                config.insert(key.to_case(Case::Camel), value);
            }
        }
    }

    if include_thoughts {
        thinking.insert("includeThoughts".to_owned(), Value::Bool(true));
    }
    if !thinking.is_empty() {
        config.insert("thinkingConfig".to_owned(), Value::Object(thinking));
    }

    config
}

fn assistant_content(message: &Message) -> Content {
    let mut parts = Vec::new();
    if !message.content.is_empty() {
        parts.push(Part::text(message.content.clone()));
    }
    for call in message.tool_calls.iter().flatten() {
        parts.push(Part {
            function_call: Some(FunctionCallBody {
                name: call.function.name.clone(),
                args: call.parsed_arguments().unwrap_or_else(|_| json!({})),
            }),
            ..Part::default()
        });
    }

    Content {
        role: Some("model"),
        parts,
    }
}

fn function_declaration(tool: &ToolDefinition) -> FunctionDeclaration {
    FunctionDeclaration {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: tool.parameters.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolCall;

    fn build(messages: &[Message], params: Map<String, Value>, include_thoughts: bool) -> Value {
        let body = build_request(
            ChatRequest {
                model: "gemini-2.5-flash",
                messages,
                tools: &[],
                params,
                stream: true,
            },
            include_thoughts,
        )
        .unwrap();
        serde_json::to_value(body).unwrap()
    }

    #[test]
    fn params_become_camel_case_generation_config() {
        let mut params = Map::new();
        params.insert("max_tokens".to_owned(), json!(100));
        params.insert("top_p".to_owned(), json!(0.9));
        params.insert("top_k".to_owned(), json!(40));
        params.insert("stop".to_owned(), json!(["x"]));
        params.insert("thinking_budget".to_owned(), json!(1024));

        let json = build(&[Message::user("hi")], params, true);
        let config = &json["generationConfig"];
        assert_eq!(config["maxOutputTokens"], 100);
        assert_eq!(config["topP"], 0.9);
        assert_eq!(config["topK"], 40);
        assert_eq!(config["stopSequences"], json!(["x"]));
        assert_eq!(config["thinkingConfig"], json!({"thinkingBudget": 1024, "includeThoughts": true}));
    }

    #[test]
    fn empty_config_is_omitted() {
        let json = build(&[Message::system("sys"), Message::user("hi")], Map::new(), false);
        assert!(json.get("generationConfig").is_none());
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(json["contents"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn tool_responses_use_function_name() {
        let messages = [
            Message::user("weather?"),
            Message::assistant_tool_calls("", vec![ToolCall::new("call_9", "weather", "{\"city\":\"Oslo\"}")]),
            Message::tool("call_9", "cold"),
        ];

        let json = build(&messages, Map::new(), false);
        let contents = json["contents"].as_array().unwrap();
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["args"]["city"], "Oslo");
        assert_eq!(contents[2]["parts"][0]["functionResponse"]["name"], "weather");
        assert_eq!(contents[2]["parts"][0]["functionResponse"]["response"], json!({"result": "cold"}));
    }
}
