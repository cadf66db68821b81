//! Named-event family decoder (`Anthropic` messages)
//!
//! Raw SSE events are first folded into [`NamedEvent`]s: `thinking` and
//! `text` fragments, tool-block starts and input deltas, a final `message`
//! summary and `error`. The decoder then applies each named event to the
//! session.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use super::{BodyShape, StreamCallbacks, StreamSession};
use crate::accumulator::ToolCallDelta;
use crate::error::LlmError;
use crate::protocol::anthropic::{MessageReply, ReplyBlock, StreamBlock, StreamDelta, StreamEvent, TokenUsage};
use crate::types::Usage;

/// Final vendor summary carried by the `message` event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageSummary {
    /// Serving model
    pub model: String,
    /// Why generation stopped
    pub stop_reason: Option<String>,
    /// Token usage, when reported
    pub usage: Option<Usage>,
}

/// One named event of this family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamedEvent {
    /// Native reasoning fragment
    Thinking(String),
    /// Visible text fragment, possibly carrying inline tags
    Text(String),
    /// A tool-use block opened
    ContentBlockStart {
        /// Dense tool ordinal
        index: u32,
        /// Tool use identifier
        id: String,
        /// Tool name
        name: String,
    },
    /// Tool input JSON fragment
    ContentBlockDelta {
        /// Dense tool ordinal
        index: u32,
        /// JSON fragment
        partial_json: String,
    },
    /// Message finished
    Message(MessageSummary),
    /// Vendor-reported error
    Error(String),
}

/// A tool-use block seen in the current message
#[derive(Debug)]
struct ToolBlock {
    ordinal: u32,
    /// Non-empty `input` of the start event, used only if no delta follows
    start_input: Option<String>,
}

/// Folds raw SSE events into [`NamedEvent`]s
///
/// Content blocks share one index space across text, thinking and tool use;
/// tool blocks are renumbered densely so the accumulator sees 0, 1, 2...
/// Streamed `input_json_delta`s replace any input carried by the block start,
/// which is otherwise released when the block stops.
#[derive(Debug, Default)]
pub struct NamedEventFolder {
    model: String,
    stop_reason: Option<String>,
    input_tokens: u32,
    output_tokens: u32,
    tool_blocks: HashMap<u32, ToolBlock>,
}

impl NamedEventFolder {
    /// Fold one raw event
    pub fn fold(&mut self, event: StreamEvent) -> Vec<NamedEvent> {
        match event {
            StreamEvent::MessageStart { message } => {
                self.model = message.model;
                if let Some(usage) = message.usage {
                    self.record_usage(usage);
                }
                Vec::new()
            }
            StreamEvent::ContentBlockStart { index, content_block } => match content_block {
                StreamBlock::Text { text } => non_empty(text).map(NamedEvent::Text).into_iter().collect(),
                StreamBlock::Thinking { thinking } => {
                    non_empty(thinking).map(NamedEvent::Thinking).into_iter().collect()
                }
                StreamBlock::ToolUse { id, name, input } => {
                    #[allow(clippy::cast_possible_truncation)]
                    let ordinal = self.tool_blocks.len() as u32;
                    // Input is usually `{}` here and streamed afterwards
                    let start_input = input
                        .as_object()
                        .is_some_and(|o| !o.is_empty())
                        .then(|| input.to_string());
                    self.tool_blocks.insert(index, ToolBlock { ordinal, start_input });

                    vec![NamedEvent::ContentBlockStart {
                        index: ordinal,
                        id,
                        name,
                    }]
                }
                StreamBlock::Other => Vec::new(),
            },
            StreamEvent::ContentBlockDelta { index, delta } => match delta {
                StreamDelta::TextDelta { text } => vec![NamedEvent::Text(text)],
                StreamDelta::ThinkingDelta { thinking } => vec![NamedEvent::Thinking(thinking)],
                StreamDelta::InputJsonDelta { partial_json } => match self.tool_blocks.get_mut(&index) {
                    Some(block) => {
                        if block.start_input.take().is_some() {
                            tracing::debug!(index, "streamed tool input replaces start input");
                        }
                        vec![NamedEvent::ContentBlockDelta {
                            index: block.ordinal,
                            partial_json,
                        }]
                    }
                    None => {
                        tracing::debug!(index, "input delta for unknown content block");
                        Vec::new()
                    }
                },
                StreamDelta::Other => Vec::new(),
            },
            StreamEvent::MessageDelta { delta, usage } => {
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason;
                }
                if let Some(usage) = usage {
                    self.record_usage(usage);
                }
                Vec::new()
            }
            StreamEvent::ContentBlockStop { index } => self
                .tool_blocks
                .get_mut(&index)
                .and_then(ToolBlock::release)
                .into_iter()
                .collect(),
            StreamEvent::MessageStop => {
                let mut blocks: Vec<&mut ToolBlock> = self.tool_blocks.values_mut().collect();
                blocks.sort_by_key(|block| block.ordinal);
                let mut events: Vec<NamedEvent> = blocks.into_iter().filter_map(ToolBlock::release).collect();
                events.push(NamedEvent::Message(self.summary()));
                events
            }
            StreamEvent::Error { error } => vec![NamedEvent::Error(error.message)],
            StreamEvent::Ping => Vec::new(),
        }
    }

    fn record_usage(&mut self, usage: TokenUsage) {
        // message_start reports input tokens, message_delta the running output count
        if usage.input_tokens > 0 {
            self.input_tokens = usage.input_tokens;
        }
        if usage.output_tokens > 0 {
            self.output_tokens = usage.output_tokens;
        }
    }

    fn summary(&self) -> MessageSummary {
        let reported = self.input_tokens > 0 || self.output_tokens > 0;
        MessageSummary {
            model: self.model.clone(),
            stop_reason: self.stop_reason.clone(),
            usage: reported.then(|| Usage::new(self.input_tokens, self.output_tokens)),
        }
    }
}

impl ToolBlock {
    fn release(&mut self) -> Option<NamedEvent> {
        self.start_input.take().map(|partial_json| NamedEvent::ContentBlockDelta {
            index: self.ordinal,
            partial_json,
        })
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

/// Decoder for named SSE events
#[derive(Debug, Default)]
pub struct NamedEventDecoder {
    folder: NamedEventFolder,
}

impl NamedEventDecoder {
    /// Fold one raw SSE event object
    pub fn decode(
        &mut self,
        chunk: &Value,
        session: &mut StreamSession,
        callbacks: &mut dyn StreamCallbacks,
    ) -> Result<(), LlmError> {
        let event = match StreamEvent::deserialize(chunk) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable named event");
                return Ok(());
            }
        };

        for named in self.folder.fold(event) {
            Self::apply(named, session, callbacks)?;
        }
        Ok(())
    }

    /// Apply one already-named event
    pub fn apply(
        event: NamedEvent,
        session: &mut StreamSession,
        callbacks: &mut dyn StreamCallbacks,
    ) -> Result<(), LlmError> {
        match event {
            NamedEvent::Thinking(text) => session.reasoning(&text, callbacks),
            NamedEvent::Text(text) => session.text(&text, callbacks),
            NamedEvent::ContentBlockStart { index, id, name } => session.tool_delta(
                ToolCallDelta {
                    index,
                    id: Some(id),
                    name: Some(name),
                    arguments: None,
                },
                callbacks,
            ),
            NamedEvent::ContentBlockDelta { index, partial_json } => session.tool_delta(
                ToolCallDelta {
                    index,
                    arguments: Some(partial_json),
                    ..ToolCallDelta::default()
                },
                callbacks,
            ),
            NamedEvent::Message(summary) => {
                session.set_model(&summary.model);
                if let Some(reason) = summary.stop_reason {
                    session.set_finish_reason(reason);
                }
                if let Some(usage) = summary.usage {
                    session.set_usage(usage);
                }
            }
            NamedEvent::Error(message) => return Err(LlmError::Stream(message)),
        }
        Ok(())
    }

    /// Fold a complete messages response body
    pub fn decode_message(
        &mut self,
        body: &Value,
        session: &mut StreamSession,
        callbacks: &mut dyn StreamCallbacks,
    ) -> Result<(), LlmError> {
        let response =
            MessageReply::deserialize(body).map_err(|e| LlmError::parse(e.to_string(), &body.to_string()))?;

        let mut tools = 0u32;
        for block in response.content {
            match block {
                ReplyBlock::Text { text } => session.text(&text, callbacks),
                ReplyBlock::Thinking { thinking } => session.reasoning(&thinking, callbacks),
                ReplyBlock::ToolUse { id, name, input } => {
                    session.tool_delta(
                        ToolCallDelta {
                            index: tools,
                            id: Some(id),
                            name: Some(name),
                            arguments: Some(input.to_string()),
                        },
                        callbacks,
                    );
                    tools += 1;
                }
                ReplyBlock::Other => {}
            }
        }

        Self::apply(
            NamedEvent::Message(MessageSummary {
                model: response.model,
                stop_reason: response.stop_reason,
                usage: response.usage.map(|u| Usage::new(u.input_tokens, u.output_tokens)),
            }),
            session,
            callbacks,
        )
    }

    /// Complete responses are `type: message`; everything else named is an event
    pub fn classify(body: &Value) -> BodyShape {
        match body.get("type").and_then(Value::as_str) {
            Some("message") => BodyShape::Message,
            Some(
                "message_start" | "content_block_start" | "content_block_delta" | "content_block_stop"
                | "message_delta" | "message_stop" | "ping" | "error",
            ) => BodyShape::Chunk,
            _ => BodyShape::Unrecognized,
        }
    }
}
