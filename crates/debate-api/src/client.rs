//! Conversation API client.

use url::Url;

use crate::config::ApiClientConfig;
use crate::error::ApiResult;
use crate::http::{HttpBackend, ReqwestBackend};

/// Default client using the reqwest HTTP backend.
pub type DefaultConversationClient = ConversationClient<ReqwestBackend>;

/// Client for the `/api/chat` endpoints.
///
/// Generic over the HTTP backend so tests can inject a fake. Production code
/// uses [`DefaultConversationClient`] through the core port traits.
pub struct ConversationClient<B: HttpBackend> {
    pub(crate) backend: B,
    /// Base URL, always ending in `/` so endpoint names join beneath it
    base_url: Url,
}

impl DefaultConversationClient {
    /// Create a client with the given configuration.
    pub fn new(config: &ApiClientConfig) -> ApiResult<Self> {
        let backend = ReqwestBackend::new(config)?;
        Self::with_backend(config, backend)
    }
}

impl<B: HttpBackend> ConversationClient<B> {
    /// Create a client over a custom backend.
    pub fn with_backend(config: &ApiClientConfig, backend: B) -> ApiResult<Self> {
        let trimmed = config.base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(&format!("{trimmed}/"))?;
        Ok(Self { backend, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, name: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(name)?)
    }

    pub(crate) fn reset_url(&self, session_id: &str) -> ApiResult<Url> {
        let mut url = self.endpoint("reset")?;
        url.query_pairs_mut().append_pair("session_id", session_id);
        Ok(url)
    }
}
