//! Terminal rendering
//!
//! Visible text goes to stdout; reasoning, tool calls and diagnostics go to
//! stderr so the reply can be piped on its own.

use std::io::Write;

use conflux_llm::params::ValidationReport;
use conflux_llm::{LlmError, LlmResponse, ModelMetadata, StreamCallbacks, ToolCall};

/// Streams callbacks straight to the terminal
#[derive(Debug, Default)]
pub struct ConsoleSink {
    in_reasoning: bool,
}

impl ConsoleSink {
    fn leave_reasoning(&mut self) {
        if self.in_reasoning {
            self.in_reasoning = false;
            eprintln!();
        }
    }
}

impl StreamCallbacks for ConsoleSink {
    fn on_token(&mut self, text: &str) {
        self.leave_reasoning();
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes()).ok();
        stdout.flush().ok();
    }

    fn on_reasoning_token(&mut self, text: &str) {
        self.in_reasoning = true;
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(text.as_bytes()).ok();
        stderr.flush().ok();
    }

    fn on_tool_call(&mut self, call: &ToolCall) {
        self.leave_reasoning();
        eprintln!("\n[tool call] {}", tool_line(call));
    }

    fn on_complete(&mut self, _response: &LlmResponse) {
        self.leave_reasoning();
        println!();
    }

    fn on_error(&mut self, error: &LlmError) {
        self.leave_reasoning();
        eprintln!("\n[error] {error}");
    }
}

fn tool_line(call: &ToolCall) -> String {
    format!("{} {}({})", call.id, call.function.name, call.function.arguments)
}

/// Print a complete single-shot response
pub fn print_response(response: &LlmResponse) -> anyhow::Result<()> {
    if let Some(reasoning) = &response.reasoning {
        eprintln!("{reasoning}\n");
    }
    println!("{}", response.content);
    for call in response.tool_calls.iter().flatten() {
        println!("{}", serde_json::to_string(call)?);
    }
    print_summary(response);
    Ok(())
}

/// Print finish reason, usage and dropped tool calls
pub fn print_summary(response: &LlmResponse) {
    let metadata = &response.metadata;
    let mut parts = vec![format!("model={}", metadata.model)];
    if let Some(reason) = &metadata.finish_reason {
        parts.push(format!("finish={reason}"));
    }
    if let Some(tokens) = metadata.token_count {
        parts.push(format!("tokens={tokens}"));
    }
    eprintln!("[{}]", parts.join(" "));

    for dropped in &response.dropped_tool_calls {
        eprintln!("[dropped] {}", dropped.error());
    }
}

/// Print one provider's model list
pub fn print_models(provider: &str, models: &[ModelMetadata]) {
    println!("{provider}:");
    for model in models {
        let context = model
            .context_window
            .map_or_else(|| "-".to_owned(), |window| window.to_string());
        let reasoning = if model.supports_reasoning { " reasoning" } else { "" };
        println!("  {:<32} {:<28} {context:>9}{reasoning}", model.id, model.name);
    }
}

/// Print validation findings
pub fn print_report(provider: &str, model: &str, report: &ValidationReport) {
    for issue in &report.errors {
        match &issue.expected {
            Some(expected) => eprintln!("error: {}: {} (expected {expected})", issue.parameter, issue.message),
            None => eprintln!("error: {}: {}", issue.parameter, issue.message),
        }
    }
    for issue in &report.warnings {
        eprintln!("warning: {}: {}", issue.parameter, issue.message);
    }
    if report.is_valid() {
        println!("{provider}/{model}: overrides are valid ({} warning(s))", report.warnings.len());
    }
}
