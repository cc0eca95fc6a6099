//! Public configuration for the conversation API client.

use std::time::Duration;

use debate_core::DEFAULT_API_BASE_URL;

/// Configuration for [`ConversationClient`](crate::ConversationClient).
///
/// # Example
///
/// ```
/// use debate_api::ApiClientConfig;
/// use std::time::Duration;
///
/// let config = ApiClientConfig::new()
///     .with_base_url("https://debate.example.org/api/chat")
///     .with_max_retries(1)
///     .with_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL of the chat API, without trailing endpoint
    pub(crate) base_url: String,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Per-request timeout
    pub(crate) timeout: Duration,
    /// Retry attempts after the first one, for network errors and timeouts
    pub(crate) max_retries: u8,
    /// Base delay for exponential backoff
    pub(crate) retry_base_delay: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: concat!("debate-api/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(300),
        }
    }
}

impl ApiClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL of the chat API.
    ///
    /// Defaults to `http://localhost:8000/api/chat`.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the per-request timeout.
    ///
    /// Defaults to 10 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of retries for network errors and timeouts.
    ///
    /// Defaults to 2 retries.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base delay for exponential backoff retries.
    ///
    /// Defaults to 300ms.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiClientConfig::new();
        assert_eq!(config.base_url, "http://localhost:8000/api/chat");
        assert!(config.user_agent.contains("debate-api"));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.retry_base_delay, Duration::from_millis(300));
    }

    #[test]
    fn test_builder_pattern() {
        let config = ApiClientConfig::new()
            .with_base_url("https://custom.api/chat")
            .with_user_agent("test-agent")
            .with_timeout(Duration::from_secs(60))
            .with_max_retries(0)
            .with_retry_delay(Duration::from_millis(5));

        assert_eq!(config.base_url(), "https://custom.api/chat");
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.retry_base_delay, Duration::from_millis(5));
    }
}
