use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Connection settings consumed by every request to one provider
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Base URL override; the adapter's default is used when absent
    pub base_url: Option<Url>,
    /// API key for authentication
    pub api_key: Option<SecretString>,
    /// Timeout for single-shot requests
    pub timeout: Duration,
    /// Timeout for streaming requests
    pub stream_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout: Duration::from_secs(60),
            stream_timeout: Duration::from_secs(600),
        }
    }
}

impl ConnectionConfig {
    /// Connection with an API key and default timeouts
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(SecretString::from(api_key.into())),
            ..Self::default()
        }
    }

    /// Replace the base URL
    #[must_use]
    pub fn base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }
}
