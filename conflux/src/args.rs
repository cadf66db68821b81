use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

/// Conflux command line
#[derive(Debug, Parser)]
#[command(name = "conflux", about = "Talk to OpenAI-compatible, Anthropic and Google models through one interface")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "conflux.toml", env = "CONFLUX_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send one prompt and print the reply
    Chat(ChatArgs),
    /// List the models a provider offers
    Models {
        /// Provider identifier; every configured provider when omitted
        #[arg(short, long)]
        provider: Option<String>,
    },
    /// Check parameter overrides against a model's schema
    Validate(ValidateArgs),
}

#[derive(Debug, clap::Args)]
pub struct ChatArgs {
    /// Provider identifier from the configuration
    #[arg(short, long)]
    pub provider: String,

    /// Model identifier
    #[arg(short, long)]
    pub model: String,

    /// Request parameter override, `key=value`; values are parsed as JSON
    /// and fall back to plain strings
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    pub overrides: Vec<(String, Value)>,

    /// JSON file holding an array of tool definitions
    #[arg(long, value_name = "FILE")]
    pub tools: Option<PathBuf>,

    /// System prompt
    #[arg(long)]
    pub system: Option<String>,

    /// Wait for the whole reply instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Seed the overrides with the schema defaults
    #[arg(long)]
    pub include_defaults: bool,

    /// User prompt
    pub prompt: String,
}

#[derive(Debug, clap::Args)]
pub struct ValidateArgs {
    /// Provider identifier from the configuration
    #[arg(short, long)]
    pub provider: String,

    /// Model identifier
    #[arg(short, long)]
    pub model: String,

    /// Additional override to check on top of the saved ones
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    pub overrides: Vec<(String, Value)>,
}

/// Parse `key=value`, reading the value as JSON when it is valid JSON
fn parse_override(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((key.to_owned(), value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn override_values_are_json_when_possible() {
        assert_eq!(parse_override("temperature=0.2").unwrap(), ("temperature".to_owned(), json!(0.2)));
        assert_eq!(parse_override("stop=[\"END\"]").unwrap(), ("stop".to_owned(), json!(["END"])));
        assert_eq!(parse_override("user=alice").unwrap(), ("user".to_owned(), json!("alice")));
        assert_eq!(parse_override("seed=null").unwrap(), ("seed".to_owned(), json!(null)));
        assert_eq!(parse_override("note=a=b").unwrap(), ("note".to_owned(), json!("a=b")));
        assert!(parse_override("temperature").is_err());
        assert!(parse_override("=1").is_err());
    }

    #[test]
    fn chat_command_line() {
        let args = Args::try_parse_from([
            "conflux",
            "--config",
            "c.toml",
            "chat",
            "-p",
            "openai",
            "-m",
            "gpt-4o",
            "--set",
            "temperature=0.5",
            "--set",
            "max_tokens=100",
            "--no-stream",
            "hello there",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("c.toml"));
        let Command::Chat(chat) = args.command else {
            panic!("expected chat");
        };
        assert_eq!(chat.provider, "openai");
        assert_eq!(chat.overrides.len(), 2);
        assert!(chat.no_stream);
        assert_eq!(chat.prompt, "hello there");
    }

    #[test]
    fn models_provider_is_optional() {
        let args = Args::try_parse_from(["conflux", "models"]).unwrap();
        assert!(matches!(args.command, Command::Models { provider: None }));
    }
}
