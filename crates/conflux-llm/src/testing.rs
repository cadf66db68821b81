//! Test doubles shared by the unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;
use serde_json::Value;

use crate::decode::StreamCallbacks;
use crate::error::LlmError;
use crate::transport::{ChunkStream, ResponseShape, Transport, WireRequest};
use crate::types::{LlmResponse, ToolCall};

/// One observed callback
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Token(String),
    Reasoning(String),
    ToolCall(ToolCall),
    Complete(LlmResponse),
    Error(String),
}

/// Callbacks that record everything in order
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Recorder {
    pub fn terminal_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Complete(_) | Event::Error(_)))
            .count()
    }

    pub fn tokens(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Token(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn reasoning(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Reasoning(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::ToolCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }
}

impl StreamCallbacks for Recorder {
    fn on_token(&mut self, text: &str) {
        self.events.push(Event::Token(text.to_owned()));
    }

    fn on_reasoning_token(&mut self, text: &str) {
        self.events.push(Event::Reasoning(text.to_owned()));
    }

    fn on_tool_call(&mut self, call: &ToolCall) {
        self.events.push(Event::ToolCall(call.clone()));
    }

    fn on_complete(&mut self, response: &LlmResponse) {
        self.events.push(Event::Complete(response.clone()));
    }

    fn on_error(&mut self, error: &LlmError) {
        self.events.push(Event::Error(error.to_string()));
    }
}

/// Canned transport answer
pub enum Reply {
    Json(Value),
    Raw(String),
    Chunks(Vec<Value>),
    ChunksThenError(Vec<Value>, LlmError),
    Status(u16, String),
}

/// Transport that replays scripted replies and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<WireRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: WireRequest) -> Reply {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Status(500, "no scripted reply".to_owned()))
    }
}

fn chunk_stream(chunks: Vec<Value>, tail: Option<LlmError>) -> ChunkStream {
    let items = chunks.into_iter().map(Ok).chain(tail.map(Err));
    Box::pin(stream::iter(items.collect::<Vec<_>>()))
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_once(&self, request: WireRequest) -> Result<ResponseShape, LlmError> {
        match self.next(request) {
            Reply::Json(value) => Ok(ResponseShape::Json(value)),
            Reply::Raw(text) => Ok(ResponseShape::Raw(text)),
            Reply::Chunks(chunks) => Ok(ResponseShape::Stream(chunk_stream(chunks, None))),
            Reply::ChunksThenError(chunks, error) => Ok(ResponseShape::Stream(chunk_stream(chunks, Some(error)))),
            Reply::Status(status, message) => Err(LlmError::Transport { status, message }),
        }
    }

    async fn open_stream(&self, request: WireRequest) -> Result<ChunkStream, LlmError> {
        match self.next(request) {
            Reply::Chunks(chunks) => Ok(chunk_stream(chunks, None)),
            Reply::ChunksThenError(chunks, error) => Ok(chunk_stream(chunks, Some(error))),
            Reply::Json(value) => Ok(chunk_stream(vec![value], None)),
            Reply::Raw(text) => Ok(chunk_stream(crate::fallback::parse_raw_event_stream(&text), None)),
            Reply::Status(status, message) => Err(LlmError::Transport { status, message }),
        }
    }
}
