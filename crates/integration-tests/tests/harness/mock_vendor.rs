//! Mock vendor backend for integration tests
//!
//! Serves canned responses in all three wire shapes, each family under its
//! own prefix: `/openai/v1`, `/anthropic/v1` and `/google/v1beta`.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// How the mock answers chat requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Well-formed JSON for single-shot requests, SSE for streams
    Normal,
    /// Single-shot requests get the stream dumped as a `text/plain` body
    RawBody,
    /// Single-shot requests get a real `text/event-stream` response
    ForcedStream,
    /// Streams report a vendor error after the first text fragment
    MidStreamError,
    /// Streams send one text fragment and then never finish
    Stall,
    /// Every request, model listing included, fails with this status
    Status(u16),
    /// Single-shot requests get an HTML error page with status 200
    Html,
}

/// One request as the mock received it
#[derive(Debug, Clone)]
pub struct Recorded {
    /// Request path without the query
    pub path: String,
    /// Request headers
    pub headers: HeaderMap,
    /// JSON body, `Null` for GETs
    pub body: Value,
}

/// Mock vendor listening on a random local port
pub struct MockVendor {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    mode: Mode,
    requests: Mutex<Vec<Recorded>>,
    model_list_count: AtomicU32,
}

impl MockState {
    fn record(&self, path: String, headers: HeaderMap, body: Value) {
        self.requests
            .lock()
            .expect("request log poisoned")
            .push(Recorded { path, headers, body });
    }
}

impl MockVendor {
    /// Start a well-behaved mock, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(Mode::Normal).await
    }

    /// Start a mock answering in `mode`
    pub async fn start_with(mode: Mode) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            mode,
            requests: Mutex::new(Vec::new()),
            model_list_count: AtomicU32::new(0),
        });

        let app = Router::new()
            .route("/openai/v1/chat/completions", routing::post(openai_chat))
            .route("/openai/v1/models", routing::get(openai_models))
            .route("/anthropic/v1/messages", routing::post(anthropic_messages))
            .route("/anthropic/v1/models", routing::get(anthropic_models))
            .route("/google/v1beta/models", routing::get(google_models))
            .route("/google/v1beta/models/{target}", routing::post(google_generate))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL of the `OpenAI`-compatible endpoints
    pub fn openai_url(&self) -> String {
        format!("http://{}/openai/v1", self.addr)
    }

    /// Base URL of the Anthropic endpoints
    pub fn anthropic_url(&self) -> String {
        format!("http://{}/anthropic/v1", self.addr)
    }

    /// Base URL of the Google endpoints
    pub fn google_url(&self) -> String {
        format!("http://{}/google/v1beta", self.addr)
    }

    /// Every chat request received so far
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().expect("request log poisoned").clone()
    }

    /// The most recent chat request
    pub fn last_request(&self) -> Recorded {
        self.requests().pop().expect("no request was received")
    }

    /// Number of model listing requests received
    pub fn model_list_count(&self) -> u32 {
        self.state.model_list_count.load(Ordering::Relaxed)
    }
}

impl Drop for MockVendor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// -- Framing helpers --

/// One SSE event, optionally named
fn frame(event: Option<&str>, data: &Value) -> String {
    match event {
        Some(name) => format!("event: {name}\ndata: {data}\n\n"),
        None => format!("data: {data}\n\n"),
    }
}

fn event_stream(body: impl Into<Body>) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/event-stream")], body.into()).into_response()
}

/// First frame, then silence until the client gives up
fn stalled_stream(first: String) -> Response {
    let frames = stream::iter([Ok::<_, Infallible>(Bytes::from(first))]).chain(stream::pending());
    event_stream(Body::from_stream(frames))
}

fn vendor_error(status: u16) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = json!({"error": {"message": format!("mock failure {}", status.as_u16()), "type": "mock_error"}});
    (status, Json(body)).into_response()
}

fn html_page() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html")],
        "<html><body>502 Bad Gateway</body></html>",
    )
        .into_response()
}

/// Shared dispatch for chat endpoints
///
/// `events` is the family's stream, `message` its single-shot body and
/// `error_event` the frame injected in [`Mode::MidStreamError`].
fn answer(
    mode: Mode,
    stream: bool,
    events: &[(Option<&'static str>, Value)],
    done_sentinel: bool,
    message: Value,
    error_event: (Option<&'static str>, Value),
) -> Response {
    let render = |events: &[(Option<&str>, Value)]| {
        let mut body: String = events.iter().map(|(name, data)| frame(*name, data)).collect();
        if done_sentinel {
            body.push_str("data: [DONE]\n\n");
        }
        body
    };

    match (mode, stream) {
        (Mode::Status(status), _) => vendor_error(status),
        (Mode::MidStreamError, true) => {
            let first_text = events.iter().position(|(_, data)| has_text(data)).unwrap_or(0);
            let mut truncated = events[..=first_text].to_vec();
            truncated.push(error_event);
            event_stream(render(&truncated))
        }
        (Mode::Stall, true) => {
            let first_text = events.iter().position(|(_, data)| has_text(data)).unwrap_or(0);
            let head: String = events[..=first_text].iter().map(|(name, data)| frame(*name, data)).collect();
            stalled_stream(head)
        }
        (_, true) | (Mode::ForcedStream, false) => event_stream(render(events)),
        (Mode::RawBody, false) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], render(events)).into_response()
        }
        (Mode::Html, false) => html_page(),
        (_, false) => Json(message).into_response(),
    }
}

/// Whether a chunk of any family carries visible text
fn has_text(data: &Value) -> bool {
    data.pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
        || data.pointer("/delta/type").and_then(Value::as_str) == Some("text_delta")
        || data
            .pointer("/candidates/0/content/parts/0/text")
            .is_some_and(|_| data.pointer("/candidates/0/content/parts/0/thought").is_none())
}

fn offers_tools(body: &Value) -> bool {
    body.get("tools")
        .and_then(Value::as_array)
        .is_some_and(|tools| !tools.is_empty())
}

fn wants_stream(body: &Value) -> bool {
    body.get("stream").and_then(Value::as_bool).unwrap_or(false)
}

// -- OpenAI --

fn openai_chunk(model: &str, delta: &Value, finish_reason: Option<&str>) -> Value {
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}]
    })
}

fn openai_stream(model: &str, tools: bool) -> Vec<(Option<&'static str>, Value)> {
    let mut chunks = vec![openai_chunk(model, &json!({"role": "assistant", "content": ""}), None)];

    if tools {
        chunks.extend([
            openai_chunk(
                model,
                &json!({"tool_calls": [{"index": 0, "id": "call_mock", "type": "function", "function": {"name": "weather", "arguments": ""}}]}),
                None,
            ),
            openai_chunk(
                model,
                &json!({"tool_calls": [{"index": 0, "function": {"arguments": "{\"city\":"}}]}),
                None,
            ),
            openai_chunk(
                model,
                &json!({"tool_calls": [{"index": 0, "function": {"arguments": "\"Oslo\"}"}}]}),
                None,
            ),
            openai_chunk(model, &json!({}), Some("tool_calls")),
        ]);
    } else {
        for fragment in ["<thi", "nk>plan</th", "ink>Hello", " world"] {
            chunks.push(openai_chunk(model, &json!({"content": fragment}), None));
        }
        chunks.push(openai_chunk(model, &json!({}), Some("stop")));
    }

    chunks.push(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "model": model,
        "choices": [],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    }));

    chunks.into_iter().map(|chunk| (None, chunk)).collect()
}

async fn openai_chat(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("/openai/v1/chat/completions".to_owned(), headers, body.clone());
    let model = body["model"].as_str().unwrap_or("mock").to_owned();

    let message = json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "<think>plan</think>Hello world"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    });

    answer(
        state.mode,
        wants_stream(&body),
        &openai_stream(&model, offers_tools(&body)),
        true,
        message,
        (None, json!({"error": {"message": "upstream overloaded", "type": "server_error"}})),
    )
}

async fn openai_models(State(state): State<Arc<MockState>>) -> Response {
    state.model_list_count.fetch_add(1, Ordering::Relaxed);
    if let Mode::Status(status) = state.mode {
        return vendor_error(status);
    }
    Json(json!({
        "object": "list",
        "data": [
            {"id": "gpt-4o", "object": "model", "owned_by": "mock"},
            {"id": "local-llama", "object": "model", "owned_by": "mock"}
        ]
    }))
    .into_response()
}

// -- Anthropic --

fn anthropic_stream(model: &str, tools: bool) -> Vec<(Option<&'static str>, Value)> {
    let mut events = vec![
        (
            Some("message_start"),
            json!({"type": "message_start", "message": {
                "id": "msg_mock", "type": "message", "role": "assistant", "model": model,
                "content": [], "usage": {"input_tokens": 12, "output_tokens": 1}
            }}),
        ),
        (
            Some("content_block_start"),
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "thinking", "thinking": ""}}),
        ),
        (
            Some("content_block_delta"),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "thinking_delta", "thinking": "weighing"}}),
        ),
        (
            Some("content_block_delta"),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "signature_delta", "signature": "c2ln"}}),
        ),
        (Some("content_block_stop"), json!({"type": "content_block_stop", "index": 0})),
        (Some("ping"), json!({"type": "ping"})),
    ];

    let stop_reason = if tools {
        events.extend([
            (
                Some("content_block_start"),
                json!({"type": "content_block_start", "index": 1, "content_block": {"type": "tool_use", "id": "toolu_mock", "name": "weather", "input": {}}}),
            ),
            (
                Some("content_block_delta"),
                json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": "{\"city\": "}}),
            ),
            (
                Some("content_block_delta"),
                json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": "\"Oslo\"}"}}),
            ),
            (Some("content_block_stop"), json!({"type": "content_block_stop", "index": 1})),
        ]);
        "tool_use"
    } else {
        events.push((
            Some("content_block_start"),
            json!({"type": "content_block_start", "index": 1, "content_block": {"type": "text", "text": ""}}),
        ));
        for fragment in ["Bon", "jour"] {
            events.push((
                Some("content_block_delta"),
                json!({"type": "content_block_delta", "index": 1, "delta": {"type": "text_delta", "text": fragment}}),
            ));
        }
        events.push((Some("content_block_stop"), json!({"type": "content_block_stop", "index": 1})));
        "end_turn"
    };

    events.extend([
        (
            Some("message_delta"),
            json!({"type": "message_delta", "delta": {"stop_reason": stop_reason, "stop_sequence": null}, "usage": {"output_tokens": 7}}),
        ),
        (Some("message_stop"), json!({"type": "message_stop"})),
    ]);
    events
}

async fn anthropic_messages(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("/anthropic/v1/messages".to_owned(), headers, body.clone());
    let model = body["model"].as_str().unwrap_or("mock").to_owned();

    let message = json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "model": model,
        "content": [
            {"type": "thinking", "thinking": "weighing", "signature": "c2ln"},
            {"type": "text", "text": "Bonjour"}
        ],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 12, "output_tokens": 7}
    });

    answer(
        state.mode,
        wants_stream(&body),
        &anthropic_stream(&model, offers_tools(&body)),
        false,
        message,
        (
            Some("error"),
            json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
        ),
    )
}

async fn anthropic_models(State(state): State<Arc<MockState>>) -> Response {
    state.model_list_count.fetch_add(1, Ordering::Relaxed);
    if let Mode::Status(status) = state.mode {
        return vendor_error(status);
    }
    Json(json!({
        "data": [{"type": "model", "id": "claude-sonnet-4-5", "display_name": "Claude Sonnet 4.5"}],
        "has_more": false
    }))
    .into_response()
}

// -- Google --

fn google_chunk(parts: &Value, finish_reason: Option<&str>) -> Value {
    let mut candidate = json!({"content": {"role": "model", "parts": parts}, "index": 0});
    if let Some(reason) = finish_reason {
        candidate["finishReason"] = json!(reason);
    }
    json!({"candidates": [candidate], "modelVersion": "gemini-2.5-flash"})
}

fn google_stream(tools: bool) -> Vec<(Option<&'static str>, Value)> {
    let mut chunks = vec![google_chunk(&json!([{"text": "pondering", "thought": true}]), None)];

    if tools {
        chunks.push(google_chunk(
            &json!([{"functionCall": {"name": "weather", "args": {"city": "Oslo"}}}]),
            Some("STOP"),
        ));
    } else {
        chunks.push(google_chunk(&json!([{"text": "Hal"}]), None));
        chunks.push(google_chunk(&json!([{"text": "lo"}]), Some("STOP")));
    }

    if let Some(last) = chunks.last_mut() {
        last["usageMetadata"] = json!({"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 9});
    }

    chunks.into_iter().map(|chunk| (None, chunk)).collect()
}

async fn google_generate(
    State(state): State<Arc<MockState>>,
    Path(target): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(format!("/google/v1beta/models/{target}"), headers, body.clone());

    let stream = target.ends_with(":streamGenerateContent");
    let mut message = google_chunk(
        &json!([{"text": "pondering", "thought": true}, {"text": "Hallo"}]),
        Some("STOP"),
    );
    message["usageMetadata"] = json!({"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 9});

    answer(
        state.mode,
        stream,
        &google_stream(offers_tools(&body)),
        false,
        message,
        (None, json!({"error": {"code": 503, "message": "model overloaded", "status": "UNAVAILABLE"}})),
    )
}

async fn google_models(State(state): State<Arc<MockState>>) -> Response {
    state.model_list_count.fetch_add(1, Ordering::Relaxed);
    if let Mode::Status(status) = state.mode {
        return vendor_error(status);
    }
    Json(json!({
        "models": [
            {"name": "models/gemini-2.5-flash", "displayName": "Gemini 2.5 Flash", "supportedGenerationMethods": ["generateContent"]},
            {"name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"]}
        ]
    }))
    .into_response()
}
