#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;
mod output;

use std::sync::Arc;

use anyhow::Context;
use args::{Args, ChatArgs, Command, ValidateArgs};
use clap::Parser;
use conflux_config::Config;
use conflux_llm::params::validate_overrides;
use conflux_llm::{AdapterRegistry, HttpTransport, Message, RequestConfig, StreamOutcome, ToolDefinition, catalog};
use output::ConsoleSink;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    conflux_telemetry::init(config.telemetry.as_ref(), "warn")?;

    tracing::debug!(config_path = %args.config.display(), "configuration loaded");

    let registry = AdapterRegistry::from_config(&config, Arc::new(HttpTransport::new()))?;

    match args.command {
        Command::Chat(chat_args) => chat(&config, &registry, chat_args).await,
        Command::Models { provider } => list_models(&config, &registry, provider.as_deref()).await,
        Command::Validate(validate_args) => validate(&config, &registry, &validate_args),
    }
}

/// Request configuration for a configured provider plus command-line overrides
fn request_config(
    config: &Config,
    provider: &str,
    model: &str,
    overrides: Vec<(String, Value)>,
) -> anyhow::Result<RequestConfig> {
    let provider_config = config
        .providers
        .iter()
        .find(|(id, _)| id.eq_ignore_ascii_case(provider))
        .map(|(_, p)| p)
        .with_context(|| format!("provider '{provider}' is not configured"))?;

    let mut request = RequestConfig::from_provider(model, provider_config)?;
    request.overrides.extend(overrides);
    Ok(request)
}

fn load_tools(path: &std::path::Path) -> anyhow::Result<Vec<ToolDefinition>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read tools file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not an array of tool definitions", path.display()))
}

async fn chat(config: &Config, registry: &AdapterRegistry, args: ChatArgs) -> anyhow::Result<()> {
    let adapter = registry.get_adapter(&args.provider)?;
    let mut request = request_config(config, &args.provider, &args.model, args.overrides)?;
    request.include_defaults = args.include_defaults;

    let tools = match &args.tools {
        Some(path) => load_tools(path)?,
        None => Vec::new(),
    };

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = args.system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(args.prompt));

    if args.no_stream {
        if !tools.is_empty() {
            tracing::warn!("tool definitions are only offered on streaming requests");
        }
        let response = adapter.send_message(&messages, &request).await?;
        output::print_response(&response)?;
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        interrupt_signal().await;
        cancel_on_signal.cancel();
    });

    let mut sink = ConsoleSink::default();
    let outcome = adapter
        .send_message_stream_with_tools(&messages, &request, &tools, &mut sink, &cancel)
        .await?;

    match outcome {
        StreamOutcome::Completed(response) => output::print_summary(&response),
        StreamOutcome::Cancelled => eprintln!("\n[cancelled]"),
    }
    Ok(())
}

async fn list_models(config: &Config, registry: &AdapterRegistry, provider: Option<&str>) -> anyhow::Result<()> {
    let selected: Vec<_> = config
        .providers
        .iter()
        .filter(|(id, _)| provider.is_none_or(|wanted| id.eq_ignore_ascii_case(wanted)))
        .collect();
    if let Some(wanted) = provider
        && selected.is_empty()
    {
        registry.get_adapter(wanted)?;
    }

    for (id, provider_config) in selected {
        let connection = provider_config.connection()?;
        let models = registry.models(id, &connection).await?;
        output::print_models(id, &models);
    }
    Ok(())
}

fn validate(config: &Config, registry: &AdapterRegistry, args: &ValidateArgs) -> anyhow::Result<()> {
    let adapter = registry.get_adapter(&args.provider)?;
    let request = request_config(config, &args.provider, &args.model, args.overrides.clone())?;
    let model = catalog::model_metadata(adapter.provider().family, &args.model);

    let mut overrides = Map::new();
    overrides.extend(request.saved.custom);
    overrides.extend(request.saved.builtin);
    overrides.extend(request.overrides);

    let report = validate_overrides(&overrides, &model.parameters);
    output::print_report(&args.provider, &args.model, &report);

    if !report.is_valid() {
        anyhow::bail!("{} invalid parameter override(s)", report.errors.len());
    }
    Ok(())
}

/// Wait for Ctrl+C; never resolves if the handler cannot be installed
async fn interrupt_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::debug!("interrupt received, cancelling stream");
}
