mod harness;

use std::time::Duration;

use conflux_config::ConnectionConfig;
use conflux_llm::{LlmError, Message, RequestConfig, StreamOutcome, ToolDefinition};
use harness::collect::Collected;
use harness::mock_vendor::{MockVendor, Mode};
use harness::{config_for, registry_for};
use serde_json::json;
use tokio_util::sync::CancellationToken;

const FAMILIES: [(&str, &str); 3] = [
    ("openai", "gpt-4o"),
    ("anthropic", "claude-sonnet-4-5"),
    ("google", "gemini-2.5-flash"),
];

fn weather_tool() -> ToolDefinition {
    ToolDefinition::new(
        "weather",
        "Current weather for a city",
        json!({"type": "object", "properties": {"city": {"type": "string"}}, "required": ["city"]}),
    )
}

fn request_for(mock: &MockVendor, provider: &str, model: &str) -> RequestConfig {
    let config = config_for(mock);
    RequestConfig::from_provider(model, &config.providers[provider]).unwrap()
}

async fn stream_with(
    mock: &MockVendor,
    provider: &str,
    request: &RequestConfig,
    tools: &[ToolDefinition],
    collected: &mut Collected,
    cancel: &CancellationToken,
) -> Result<StreamOutcome, LlmError> {
    let registry = registry_for(&config_for(mock));
    let adapter = registry.get_adapter(provider).unwrap();
    adapter
        .send_message_stream_with_tools(&[Message::user("hello")], request, tools, collected, cancel)
        .await
}

async fn stream_chat(
    mock: &MockVendor,
    provider: &str,
    model: &str,
    tools: &[ToolDefinition],
) -> (Result<StreamOutcome, LlmError>, Collected) {
    let request = request_for(mock, provider, model);
    let mut collected = Collected::default();
    let outcome = stream_with(mock, provider, &request, tools, &mut collected, &CancellationToken::new()).await;
    (outcome, collected)
}

#[tokio::test]
async fn openai_stream_splits_inline_reasoning() {
    let mock = MockVendor::start().await.unwrap();
    let (outcome, collected) = stream_chat(&mock, "openai", "gpt-4o", &[]).await;

    let response = outcome.unwrap().into_response().unwrap();
    assert_eq!(collected.tokens, "Hello world");
    assert_eq!(collected.reasoning, "plan");
    assert_eq!(collected.terminal_count(), 1);
    assert_eq!(collected.completed[0], response);

    assert_eq!(response.content, "Hello world");
    assert_eq!(response.reasoning.as_deref(), Some("plan"));
    assert_eq!(response.metadata.finish_reason.as_deref(), Some("stop"));
    assert_eq!(response.metadata.token_count, Some(15));
}

#[tokio::test]
async fn openai_compatible_request_shape() {
    let mock = MockVendor::start().await.unwrap();
    let (outcome, _) = stream_chat(&mock, "openai", "gpt-4o", &[]).await;
    outcome.unwrap();

    let request = mock.last_request();
    assert_eq!(request.path, "/openai/v1/chat/completions");
    // Local compatible servers run keyless and reject stream_options
    assert!(request.headers.get("authorization").is_none());
    assert!(request.body.get("stream_options").is_none());
    assert_eq!(request.body["stream"], json!(true));
    assert_eq!(request.body["temperature"], json!(0.7));
    assert_eq!(request.body["user"], json!("conflux-tests"));
}

#[tokio::test]
async fn request_overrides_layer_over_saved_ones() {
    let mock = MockVendor::start().await.unwrap();
    let request = request_for(&mock, "openai", "gpt-4o")
        .with_override("temperature", json!(null))
        .with_override("max_tokens", json!(64))
        .with_override("__proto__", json!({"polluted": true}));

    let mut collected = Collected::default();
    stream_with(&mock, "openai", &request, &[], &mut collected, &CancellationToken::new())
        .await
        .unwrap();

    let body = mock.last_request().body;
    assert!(body.get("temperature").is_none());
    assert!(body.get("__proto__").is_none());
    assert_eq!(body["max_tokens"], json!(64));
    assert_eq!(body["user"], json!("conflux-tests"));
}

#[tokio::test]
async fn anthropic_stream_with_native_thinking() {
    let mock = MockVendor::start().await.unwrap();
    let (outcome, collected) = stream_chat(&mock, "anthropic", "claude-sonnet-4-5", &[]).await;

    let response = outcome.unwrap().into_response().unwrap();
    assert_eq!(collected.tokens, "Bonjour");
    assert_eq!(collected.reasoning, "weighing");
    assert_eq!(collected.terminal_count(), 1);
    assert_eq!(response.metadata.finish_reason.as_deref(), Some("end_turn"));
    assert_eq!(response.metadata.token_count, Some(19));

    let request = mock.last_request();
    assert_eq!(request.headers["x-api-key"], "ak-test");
    assert!(request.headers.get("anthropic-version").is_some());
    assert_eq!(request.body["max_tokens"], json!(4096));
    assert_eq!(request.body["stream"], json!(true));
}

#[tokio::test]
async fn google_stream_routes_thought_parts() {
    let mock = MockVendor::start().await.unwrap();
    let (outcome, collected) = stream_chat(&mock, "google", "gemini-2.5-flash", &[]).await;

    let response = outcome.unwrap().into_response().unwrap();
    assert_eq!(collected.tokens, "Hallo");
    assert_eq!(collected.reasoning, "pondering");
    assert_eq!(response.metadata.finish_reason.as_deref(), Some("STOP"));
    assert_eq!(response.metadata.token_count, Some(9));

    let request = mock.last_request();
    assert_eq!(request.path, "/google/v1beta/models/gemini-2.5-flash:streamGenerateContent");
    assert_eq!(request.headers["x-goog-api-key"], "gk-test");
    assert_eq!(request.body["contents"][0]["role"], json!("user"));
}

#[tokio::test]
async fn tool_calls_complete_once_in_every_family() {
    let mock = MockVendor::start().await.unwrap();

    for (provider, model) in FAMILIES {
        let (outcome, collected) = stream_chat(&mock, provider, model, &[weather_tool()]).await;
        let response = outcome.unwrap().into_response().unwrap();

        assert_eq!(collected.tool_calls.len(), 1, "{provider}");
        let call = &collected.tool_calls[0];
        assert_eq!(call.function.name, "weather", "{provider}");
        assert_eq!(call.parsed_arguments().unwrap(), json!({"city": "Oslo"}), "{provider}");
        assert!(!call.id.is_empty(), "{provider}");

        assert_eq!(response.tool_calls.as_deref(), Some(&collected.tool_calls[..]), "{provider}");
        assert!(response.dropped_tool_calls.is_empty(), "{provider}");
        assert_eq!(collected.terminal_count(), 1, "{provider}");
    }
}

#[tokio::test]
async fn vendor_error_mid_stream_fires_on_error_once() {
    let mock = MockVendor::start_with(Mode::MidStreamError).await.unwrap();

    for (provider, model) in FAMILIES {
        let (outcome, collected) = stream_chat(&mock, provider, model, &[]).await;

        let err = outcome.unwrap_err();
        assert!(matches!(err, LlmError::Stream(_)), "{provider}: {err}");
        assert!(collected.completed.is_empty(), "{provider}");
        assert_eq!(collected.errors, [err.to_string()], "{provider}");
    }
}

#[tokio::test]
async fn rejected_stream_reports_vendor_message() {
    let mock = MockVendor::start_with(Mode::Status(401)).await.unwrap();
    let (outcome, collected) = stream_chat(&mock, "anthropic", "claude-sonnet-4-5", &[]).await;

    let err = outcome.unwrap_err();
    assert!(matches!(&err, LlmError::Transport { status: 401, message } if message == "mock failure 401"));
    assert!(!err.is_retryable());
    assert!(collected.tokens.is_empty());
    assert_eq!(collected.errors.len(), 1);
}

#[tokio::test]
async fn cancellation_stops_without_terminal_callback() {
    let mock = MockVendor::start_with(Mode::Stall).await.unwrap();
    let request = request_for(&mock, "anthropic", "claude-sonnet-4-5");
    let cancel = CancellationToken::new();
    let mut collected = Collected::cancelling(cancel.clone());

    let outcome = stream_with(&mock, "anthropic", &request, &[], &mut collected, &cancel)
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Cancelled);
    assert_eq!(collected.tokens, "Bon");
    assert_eq!(collected.terminal_count(), 0);
}

#[tokio::test]
async fn stalled_stream_times_out() {
    let mock = MockVendor::start_with(Mode::Stall).await.unwrap();
    let mut request = request_for(&mock, "anthropic", "claude-sonnet-4-5");
    request.connection.stream_timeout = Duration::from_secs(1);

    let mut collected = Collected::default();
    let err = stream_with(&mock, "anthropic", &request, &[], &mut collected, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_retryable(), "{err}");
    assert_eq!(collected.tokens, "Bon");
    assert!(collected.completed.is_empty());
    assert_eq!(collected.errors.len(), 1);
}

#[tokio::test]
async fn missing_key_fails_before_any_request() {
    let mock = MockVendor::start().await.unwrap();
    let connection = ConnectionConfig::default().base_url(mock.anthropic_url().parse().unwrap());
    let request = RequestConfig::new("claude-sonnet-4-5", connection);

    let mut collected = Collected::default();
    let err = stream_with(&mock, "anthropic", &request, &[], &mut collected, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::MissingCredential { ref provider } if provider == "anthropic"));
    assert_eq!(collected.terminal_count(), 0);
    assert!(mock.requests().is_empty());
}
