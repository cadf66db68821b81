//! Built-in provider metadata, model lists and parameter schemas
//!
//! Dynamic listings are merged with these entries by model id, so a model
//! the vendor reports gets its declared schema whenever one is known here.

use serde_json::json;

use crate::params::ParameterSchemaEntry;
use crate::types::{ModelMetadata, ProviderMetadata, VendorFamily};

/// Default `OpenAI` API base URL
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Anthropic API base URL
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic API version header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default Google Generative Language API base URL
pub const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Metadata of a built-in provider
pub fn provider_metadata(family: VendorFamily) -> ProviderMetadata {
    let (id, name, base_url) = match family {
        VendorFamily::DeltaChunk => ("openai", "OpenAI", OPENAI_BASE_URL),
        VendorFamily::NamedEvent => ("anthropic", "Anthropic", ANTHROPIC_BASE_URL),
        VendorFamily::PartArray => ("google", "Google Gemini", GOOGLE_BASE_URL),
    };
    ProviderMetadata {
        id: id.to_owned(),
        name: name.to_owned(),
        family,
        default_base_url: base_url.to_owned(),
        requires_api_key: true,
    }
}

/// Schema applied to models without a specific entry
pub fn default_schema(family: VendorFamily) -> Vec<ParameterSchemaEntry> {
    match family {
        VendorFamily::DeltaChunk => openai_chat_schema(),
        VendorFamily::NamedEvent => anthropic_schema(false),
        VendorFamily::PartArray => google_schema(false),
    }
}

/// Static model list of a built-in provider
pub fn static_models(family: VendorFamily) -> Vec<ModelMetadata> {
    match family {
        VendorFamily::DeltaChunk => openai_models(),
        VendorFamily::NamedEvent => anthropic_models(),
        VendorFamily::PartArray => google_models(),
    }
}

fn model(
    id: &str,
    name: &str,
    context_window: u32,
    supports_reasoning: bool,
    parameters: Vec<ParameterSchemaEntry>,
) -> ModelMetadata {
    ModelMetadata {
        id: id.to_owned(),
        name: name.to_owned(),
        context_window: Some(context_window),
        supports_tools: true,
        supports_reasoning,
        parameters,
    }
}

fn stop_sequences() -> ParameterSchemaEntry {
    ParameterSchemaEntry::string("stop")
        .array()
        .describe("Sequences that end generation")
}

fn openai_chat_schema() -> Vec<ParameterSchemaEntry> {
    vec![
        ParameterSchemaEntry::number("temperature")
            .range(0.0, 2.0)
            .default_value(json!(1.0))
            .describe("Sampling temperature"),
        ParameterSchemaEntry::number("top_p").range(0.0, 1.0).default_value(json!(1.0)),
        ParameterSchemaEntry::integer("max_tokens").at_least(1.0),
        ParameterSchemaEntry::number("frequency_penalty").range(-2.0, 2.0),
        ParameterSchemaEntry::number("presence_penalty").range(-2.0, 2.0),
        ParameterSchemaEntry::integer("seed"),
        stop_sequences(),
    ]
}

fn openai_reasoning_schema() -> Vec<ParameterSchemaEntry> {
    vec![
        ParameterSchemaEntry::string("reasoning_effort")
            .allowed([json!("low"), json!("medium"), json!("high")])
            .default_value(json!("medium")),
        ParameterSchemaEntry::integer("max_completion_tokens").at_least(1.0),
        ParameterSchemaEntry::integer("seed"),
        stop_sequences(),
    ]
}

fn openai_models() -> Vec<ModelMetadata> {
    vec![
        model("gpt-4o", "GPT-4o", 128_000, false, openai_chat_schema()),
        model("gpt-4o-mini", "GPT-4o mini", 128_000, false, openai_chat_schema()),
        model("gpt-4.1", "GPT-4.1", 1_047_576, false, openai_chat_schema()),
        model("o3-mini", "o3-mini", 200_000, true, openai_reasoning_schema()),
    ]
}

fn anthropic_schema(thinking: bool) -> Vec<ParameterSchemaEntry> {
    let mut schema = vec![
        ParameterSchemaEntry::number("temperature").range(0.0, 1.0).default_value(json!(1.0)),
        ParameterSchemaEntry::number("top_p").range(0.0, 1.0),
        ParameterSchemaEntry::integer("top_k").at_least(0.0),
        ParameterSchemaEntry::integer("max_tokens")
            .at_least(1.0)
            .default_value(json!(4096))
            .describe("Required by the Messages API"),
        stop_sequences(),
    ];
    if thinking {
        schema.push(
            ParameterSchemaEntry::integer("thinking_budget")
                .at_least(1024.0)
                .describe("Extended thinking token budget"),
        );
    }
    schema
}

fn anthropic_models() -> Vec<ModelMetadata> {
    vec![
        model("claude-sonnet-4-5", "Claude Sonnet 4.5", 200_000, true, anthropic_schema(true)),
        model("claude-opus-4-1", "Claude Opus 4.1", 200_000, true, anthropic_schema(true)),
        model(
            "claude-3-5-haiku-latest",
            "Claude Haiku 3.5",
            200_000,
            false,
            anthropic_schema(false),
        ),
    ]
}

fn google_schema(thinking: bool) -> Vec<ParameterSchemaEntry> {
    let mut schema = vec![
        ParameterSchemaEntry::number("temperature").range(0.0, 2.0).default_value(json!(1.0)),
        ParameterSchemaEntry::number("top_p").range(0.0, 1.0),
        ParameterSchemaEntry::integer("top_k").at_least(1.0),
        ParameterSchemaEntry::integer("max_tokens").at_least(1.0).default_value(json!(8192)),
        ParameterSchemaEntry::integer("seed"),
        stop_sequences(),
    ];
    if thinking {
        schema.push(
            ParameterSchemaEntry::integer("thinking_budget")
                .range(-1.0, 32_768.0)
                .describe("-1 lets the model decide, 0 disables thinking"),
        );
    }
    schema
}

fn google_models() -> Vec<ModelMetadata> {
    vec![
        model("gemini-2.5-pro", "Gemini 2.5 Pro", 1_048_576, true, google_schema(true)),
        model("gemini-2.5-flash", "Gemini 2.5 Flash", 1_048_576, true, google_schema(true)),
        model("gemini-2.0-flash", "Gemini 2.0 Flash", 1_048_576, false, google_schema(false)),
    ]
}

/// Metadata for `model_id`, falling back to the family schema
pub fn model_metadata(family: VendorFamily, model_id: &str) -> ModelMetadata {
    static_models(family)
        .into_iter()
        .find(|m| m.id == model_id)
        .unwrap_or_else(|| ModelMetadata::discovered(model_id, default_schema(family)))
}
