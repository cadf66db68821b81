//! Callback sink that records everything a stream reports

use conflux_llm::{LlmError, LlmResponse, StreamCallbacks, ToolCall};
use tokio_util::sync::CancellationToken;

/// Everything observed through the callbacks of one stream
#[derive(Debug, Default)]
pub struct Collected {
    pub tokens: String,
    pub token_events: usize,
    pub reasoning: String,
    pub tool_calls: Vec<ToolCall>,
    pub completed: Vec<LlmResponse>,
    pub errors: Vec<String>,
    /// Cancelled as soon as the first visible token arrives
    pub cancel_on_token: Option<CancellationToken>,
}

impl Collected {
    /// Collector that cancels `token` on the first visible token
    pub fn cancelling(token: CancellationToken) -> Self {
        Self {
            cancel_on_token: Some(token),
            ..Self::default()
        }
    }

    /// Number of terminal callbacks fired
    pub fn terminal_count(&self) -> usize {
        self.completed.len() + self.errors.len()
    }
}

impl StreamCallbacks for Collected {
    fn on_token(&mut self, text: &str) {
        self.tokens.push_str(text);
        self.token_events += 1;
        if let Some(token) = &self.cancel_on_token {
            token.cancel();
        }
    }

    fn on_reasoning_token(&mut self, text: &str) {
        self.reasoning.push_str(text);
    }

    fn on_tool_call(&mut self, call: &ToolCall) {
        self.tool_calls.push(call.clone());
    }

    fn on_complete(&mut self, response: &LlmResponse) {
        self.completed.push(response.clone());
    }

    fn on_error(&mut self, error: &LlmError) {
        self.errors.push(error.to_string());
    }
}
