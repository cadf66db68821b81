use thiserror::Error;

/// Maximum number of payload characters quoted in a parse error
pub const SNIPPET_LIMIT: usize = 200;

/// Errors that can occur while talking to an LLM vendor
#[derive(Debug, Error)]
pub enum LlmError {
    /// Vendor answered with a non-success HTTP status
    #[error("upstream returned {status}: {message}")]
    Transport {
        /// HTTP status code
        status: u16,
        /// Message reported by the vendor
        message: String,
    },

    /// Connection-level failure reported by the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Request exceeded its configured timeout
    #[error("request timed out after {seconds}s")]
    Timeout {
        /// Configured timeout in seconds
        seconds: u64,
    },

    /// Response could not be turned into usable content
    #[error("failed to parse response: {message} (payload: {snippet})")]
    Parse {
        /// What went wrong
        message: String,
        /// Bounded prefix of the offending payload
        snippet: String,
    },

    /// Accumulated tool-call arguments never became valid JSON
    #[error("tool call {name} ({id}) has malformed arguments: {message}")]
    MalformedToolArguments {
        /// Tool call identifier
        id: String,
        /// Function name
        name: String,
        /// JSON parser message
        message: String,
    },

    /// Invalid configuration for this request
    #[error("configuration error: {0}")]
    Config(String),

    /// The provider requires a credential and none was supplied
    #[error("missing API key for provider {provider}")]
    MissingCredential {
        /// Provider identifier
        provider: String,
    },

    /// No adapter is registered under this identifier
    #[error("unknown provider '{provider}' (available: {available})")]
    UnknownProvider {
        /// Requested identifier
        provider: String,
        /// Comma-separated registered identifiers
        available: String,
    },

    /// A request must carry at least one message
    #[error("message list is empty")]
    EmptyMessages,

    /// A message role the vendor cannot represent
    #[error("unsupported message role '{role}'")]
    UnsupportedRole {
        /// Offending role
        role: String,
    },

    /// Vendor reported an error inside an open stream
    #[error("stream error: {0}")]
    Stream(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LlmError {
    /// Build a parse error quoting a bounded prefix of `payload`
    pub fn parse(message: impl Into<String>, payload: &str) -> Self {
        Self::Parse {
            message: message.into(),
            snippet: snippet(payload),
        }
    }

    /// Whether a caller-level retry might succeed
    ///
    /// This layer never retries on its own; the classification is for callers.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status, .. } => *status == 429 || *status >= 500,
            Self::Network(_) | Self::Timeout { .. } | Self::Stream(_) => true,
            _ => false,
        }
    }

    /// Whether this error was raised before any transport call
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::MissingCredential { .. }
                | Self::UnknownProvider { .. }
                | Self::EmptyMessages
                | Self::UnsupportedRole { .. }
        )
    }
}

/// Bounded, char-boundary safe prefix of a payload for diagnostics
pub fn snippet(payload: &str) -> String {
    match payload.char_indices().nth(SNIPPET_LIMIT) {
        Some((end, _)) => format!("{}...", &payload[..end]),
        None => payload.to_owned(),
    }
}
