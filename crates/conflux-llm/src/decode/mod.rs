//! Vendor stream decoding
//!
//! Each vendor family has one decoder that turns its chunk objects into the
//! unified callbacks. Decoders share a [`StreamSession`] that owns the
//! accumulated channels, the inline tag extractor and the tool-call table.
//! [`drive_stream`] is the per-chunk dispatch loop and enforces the terminal
//! contract: exactly one of `on_complete` / `on_error`, unless the caller
//! cancels, in which case neither fires.

pub mod anthropic;
pub mod google;
pub mod openai;

use futures_util::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::accumulator::{ToolCallAccumulator, ToolCallDelta};
use crate::error::LlmError;
use crate::think::{Segment, TagExtractor};
use crate::transport::ChunkStream;
use crate::types::{LlmResponse, ResponseMetadata, ToolCall, Usage, VendorFamily};

pub use anthropic::{MessageSummary, NamedEvent, NamedEventDecoder, NamedEventFolder};
pub use google::PartArrayDecoder;
pub use openai::DeltaChunkDecoder;

/// Receiver of unified stream events
///
/// Callbacks run in chunk arrival order on the task driving the stream.
pub trait StreamCallbacks: Send {
    /// Visible text fragment
    fn on_token(&mut self, text: &str);

    /// Reasoning text fragment
    fn on_reasoning_token(&mut self, text: &str) {
        let _ = text;
    }

    /// A tool call whose arguments are complete JSON; fires once per call
    fn on_tool_call(&mut self, call: &ToolCall) {
        let _ = call;
    }

    /// Terminal: the aggregated response
    fn on_complete(&mut self, response: &LlmResponse);

    /// Terminal: the error that ended the session
    fn on_error(&mut self, error: &LlmError);
}

/// Callbacks that ignore everything, used when aggregating single-shot bodies
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl StreamCallbacks for Discard {
    fn on_token(&mut self, _text: &str) {}

    fn on_complete(&mut self, _response: &LlmResponse) {}

    fn on_error(&mut self, _error: &LlmError) {}
}

/// How a stream ended without error
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    /// The stream ran to its end; `on_complete` fired with this response
    Completed(LlmResponse),
    /// The caller cancelled; no terminal callback fired
    Cancelled,
}

impl StreamOutcome {
    /// The response, if the stream completed
    pub fn into_response(self) -> Option<LlmResponse> {
        match self {
            Self::Completed(response) => Some(response),
            Self::Cancelled => None,
        }
    }
}

/// How a single-shot body should be folded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyShape {
    /// The family's complete-response object
    Message,
    /// One streaming chunk
    Chunk,
    /// A JSON array of streaming chunks
    Chunks,
    /// Neither; treated as a parse error
    Unrecognized,
}

/// State of one in-flight request, owned by exactly one decoder
#[derive(Debug)]
pub struct StreamSession {
    content: String,
    reasoning: String,
    tags: Option<TagExtractor>,
    tools: ToolCallAccumulator,
    direct_calls: Vec<ToolCall>,
    metadata: ResponseMetadata,
}

impl StreamSession {
    /// New session; `inline_reasoning` routes `<think>` blocks in visible
    /// text to the reasoning channel
    pub fn new(model: impl Into<String>, inline_reasoning: bool) -> Self {
        Self {
            content: String::new(),
            reasoning: String::new(),
            tags: inline_reasoning.then(TagExtractor::default),
            tools: ToolCallAccumulator::new(),
            direct_calls: Vec::new(),
            metadata: ResponseMetadata {
                model: model.into(),
                ..ResponseMetadata::default()
            },
        }
    }

    /// Visible text that may carry inline reasoning tags
    pub fn text(&mut self, fragment: &str, callbacks: &mut dyn StreamCallbacks) {
        if fragment.is_empty() {
            return;
        }
        match self.tags.as_mut() {
            Some(tags) => {
                for segment in tags.push(fragment) {
                    self.route(segment, callbacks);
                }
            }
            None => self.content(fragment, callbacks),
        }
    }

    /// Visible text that bypasses tag extraction
    pub fn content(&mut self, text: &str, callbacks: &mut dyn StreamCallbacks) {
        if text.is_empty() {
            return;
        }
        self.content.push_str(text);
        callbacks.on_token(text);
    }

    /// Text from a native reasoning channel
    pub fn reasoning(&mut self, text: &str, callbacks: &mut dyn StreamCallbacks) {
        if text.is_empty() {
            return;
        }
        self.reasoning.push_str(text);
        callbacks.on_reasoning_token(text);
    }

    /// Incremental tool-call fragment
    pub fn tool_delta(&mut self, delta: ToolCallDelta, callbacks: &mut dyn StreamCallbacks) {
        if let Some(call) = self.tools.apply(delta) {
            callbacks.on_tool_call(&call);
        }
    }

    /// Tool call delivered whole by the vendor
    pub fn tool_call(&mut self, call: ToolCall, callbacks: &mut dyn StreamCallbacks) {
        callbacks.on_tool_call(&call);
        self.direct_calls.push(call);
    }

    /// Record the serving model, ignoring empty values
    pub fn set_model(&mut self, model: &str) {
        if !model.is_empty() {
            model.clone_into(&mut self.metadata.model);
        }
    }

    /// Record why generation stopped, ignoring empty values
    pub fn set_finish_reason(&mut self, reason: String) {
        if !reason.is_empty() {
            self.metadata.finish_reason = Some(reason);
        }
    }

    /// Record token usage
    pub fn set_usage(&mut self, usage: Usage) {
        self.metadata.token_count = Some(usage.total_tokens);
        self.metadata.usage = Some(usage);
    }

    fn route(&mut self, segment: Segment, callbacks: &mut dyn StreamCallbacks) {
        match segment {
            Segment::Content(text) => self.content(&text, callbacks),
            Segment::Reasoning(text) => self.reasoning(&text, callbacks),
        }
    }

    /// Flush pending state and assemble the response
    ///
    /// Tool calls that only became usable now are surfaced before returning.
    pub fn finish(mut self, callbacks: &mut dyn StreamCallbacks) -> LlmResponse {
        if let Some(segment) = self.tags.as_mut().and_then(TagExtractor::finish) {
            self.route(segment, callbacks);
        }

        let summary = self.tools.finish();
        for call in &summary.late {
            callbacks.on_tool_call(call);
        }

        let mut calls = self.direct_calls;
        calls.extend(summary.completed);

        let mut response = LlmResponse::new(self.content, self.reasoning, calls, self.metadata);
        response.dropped_tool_calls = summary.dropped;
        response
    }
}

/// The decoder for one vendor family
#[derive(Debug)]
pub enum FamilyDecoder {
    /// Delta-JSON chunks
    DeltaChunk(DeltaChunkDecoder),
    /// Named SSE events
    NamedEvent(NamedEventDecoder),
    /// Candidate part arrays
    PartArray(PartArrayDecoder),
}

impl FamilyDecoder {
    /// Fresh decoder for `family`
    pub fn new(family: VendorFamily) -> Self {
        match family {
            VendorFamily::DeltaChunk => Self::DeltaChunk(DeltaChunkDecoder),
            VendorFamily::NamedEvent => Self::NamedEvent(NamedEventDecoder::default()),
            VendorFamily::PartArray => Self::PartArray(PartArrayDecoder),
        }
    }

    /// Family this decoder speaks
    pub const fn family(&self) -> VendorFamily {
        match self {
            Self::DeltaChunk(_) => VendorFamily::DeltaChunk,
            Self::NamedEvent(_) => VendorFamily::NamedEvent,
            Self::PartArray(_) => VendorFamily::PartArray,
        }
    }

    /// Fold one streamed chunk into the session
    ///
    /// Unparseable chunks are skipped; vendor error objects end the session.
    pub fn decode(
        &mut self,
        chunk: &Value,
        session: &mut StreamSession,
        callbacks: &mut dyn StreamCallbacks,
    ) -> Result<(), LlmError> {
        match self {
            Self::DeltaChunk(decoder) => decoder.decode(chunk, session, callbacks),
            Self::NamedEvent(decoder) => decoder.decode(chunk, session, callbacks),
            Self::PartArray(decoder) => decoder.decode(chunk, session, callbacks),
        }
    }

    /// Fold a complete single-shot response body into the session
    pub fn decode_message(
        &mut self,
        body: &Value,
        session: &mut StreamSession,
        callbacks: &mut dyn StreamCallbacks,
    ) -> Result<(), LlmError> {
        match self {
            Self::DeltaChunk(decoder) => decoder.decode_message(body, session, callbacks),
            Self::NamedEvent(decoder) => decoder.decode_message(body, session, callbacks),
            Self::PartArray(decoder) => decoder.decode_message(body, session, callbacks),
        }
    }

    /// Decide how a single-shot body should be folded
    pub fn classify(&self, body: &Value) -> BodyShape {
        if body.is_array() {
            return BodyShape::Chunks;
        }
        match self {
            Self::DeltaChunk(_) => DeltaChunkDecoder::classify(body),
            Self::NamedEvent(_) => NamedEventDecoder::classify(body),
            Self::PartArray(_) => PartArrayDecoder::classify(body),
        }
    }
}

/// Drive a chunk stream to its terminal callback
///
/// Returns the same error that was passed to `on_error`. On cancellation no
/// further chunk is read and no terminal callback fires.
pub async fn drive_stream(
    mut chunks: ChunkStream,
    mut decoder: FamilyDecoder,
    mut session: StreamSession,
    callbacks: &mut dyn StreamCallbacks,
    cancel: &CancellationToken,
) -> Result<StreamOutcome, LlmError> {
    let mut count = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(chunks = count, "stream cancelled by caller");
                return Ok(StreamOutcome::Cancelled);
            }
            next = chunks.next() => next,
        };

        match next {
            None => break,
            Some(Ok(chunk)) => {
                count += 1;
                if let Err(error) = decoder.decode(&chunk, &mut session, callbacks) {
                    return Err(fail(error, callbacks));
                }
            }
            Some(Err(error)) => return Err(fail(error, callbacks)),
        }
    }

    let response = session.finish(callbacks);
    tracing::debug!(
        family = ?decoder.family(),
        chunks = count,
        finish_reason = ?response.metadata.finish_reason,
        "stream completed"
    );
    callbacks.on_complete(&response);
    Ok(StreamOutcome::Completed(response))
}

fn fail(error: LlmError, callbacks: &mut dyn StreamCallbacks) -> LlmError {
    tracing::error!(error = %error, "stream failed");
    callbacks.on_error(&error);
    error
}
