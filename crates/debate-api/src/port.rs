//! Port trait implementations for `ConversationClient`.
//!
//! Implements the core-owned `ConversationApiPort` and `SpeechSynthesisPort`
//! traits and maps internal errors to `ApiPortError`.

use async_trait::async_trait;
use debate_core::ports::{
    ApiPortError, ConversationApiPort, MessageReply, MessageRequest, RecommendationReply,
    RecommendationRequest, SpeechSynthesisPort, StartReply, StartRequest, SynthesisRequest,
    SynthesizedAudio,
};
use tracing::debug;

use crate::client::ConversationClient;
use crate::error::ApiError;
use crate::http::HttpBackend;
use crate::speech::normalize_speech;

// ============================================================================
// Error Mapping
// ============================================================================

/// Convert internal `ApiError` to core `ApiPortError`.
fn map_error(err: ApiError) -> ApiPortError {
    match err {
        ApiError::Status { status, body, .. } => ApiPortError::Http { status, body },
        ApiError::Timeout { url } => ApiPortError::Timeout(url),
        ApiError::Network(e) if e.is_timeout() => ApiPortError::Timeout(e.to_string()),
        ApiError::Network(e) => ApiPortError::Transport(e.to_string()),
        ApiError::InvalidUrl(e) => ApiPortError::Transport(format!("invalid URL: {e}")),
        ApiError::InvalidResponse { message } => ApiPortError::InvalidResponse(message),
        ApiError::JsonParse(e) => ApiPortError::InvalidResponse(e.to_string()),
        ApiError::Base64(e) => ApiPortError::InvalidResponse(e.to_string()),
    }
}

// ============================================================================
// Port Implementations
// ============================================================================

#[async_trait]
impl<B: HttpBackend> ConversationApiPort for ConversationClient<B> {
    async fn start(&self, request: &StartRequest) -> Result<StartReply, ApiPortError> {
        let url = self.endpoint("start").map_err(map_error)?;
        debug!(language = %request.language, "POST /start");
        self.backend
            .post_json(&url, request)
            .await
            .map_err(map_error)
    }

    async fn send_message(&self, request: &MessageRequest) -> Result<MessageReply, ApiPortError> {
        let url = self.endpoint("message").map_err(map_error)?;
        debug!(chars = request.message.len(), "POST /message");
        self.backend
            .post_json(&url, request)
            .await
            .map_err(map_error)
    }

    async fn reset(&self, session_id: &str) -> Result<(), ApiPortError> {
        let url = self.reset_url(session_id).map_err(map_error)?;
        debug!("POST /reset");
        self.backend.post_empty(&url).await.map_err(map_error)
    }

    async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationReply, ApiPortError> {
        let url = self
            .endpoint("generate_recommendations")
            .map_err(map_error)?;
        debug!(
            history = request.conversation_history.len(),
            "POST /generate_recommendations"
        );
        self.backend
            .post_json(&url, request)
            .await
            .map_err(map_error)
    }
}

#[async_trait]
impl<B: HttpBackend> SpeechSynthesisPort for ConversationClient<B> {
    async fn generate_speech(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, ApiPortError> {
        let url = self.endpoint("generate_speech").map_err(map_error)?;
        let raw = self
            .backend
            .post_raw(&url, request)
            .await
            .map_err(map_error)?;
        let audio = normalize_speech(raw).map_err(map_error)?;
        debug!(bytes = audio.bytes.len(), mime = %audio.mime_type, "Speech synthesized");
        Ok(audio)
    }
}
