//! Conversation API port and its wire DTOs.
//!
//! Field names follow the JSON the server speaks (`snake_case`), so the DTOs
//! serialize without renames.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Language, RawMessage, RecommendedAnswer};

// ── DTOs ─────────────────────────────────────────────────────────────────────

/// Body of `POST /start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub language: Language,
    pub session_id: String,
}

/// Response of `POST /start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartReply {
    pub opening_message: String,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub recommended_answers: Vec<RecommendedAnswer>,
}

/// Body of `POST /message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRequest {
    pub message: String,
    pub language: Language,
    pub session_id: String,
}

/// Response of `POST /message`.
///
/// Older servers answer with a single `response` string, newer ones with a
/// `responses` list of speaker-tagged replies. Both may appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub responses: Vec<RawMessage>,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub recommended_answers: Vec<RecommendedAnswer>,
}

impl MessageReply {
    /// All bot replies in display order.
    ///
    /// `responses` wins when present; a lone `response` string becomes a
    /// single debate-partner reply.
    #[must_use]
    pub fn raw_messages(&self) -> Vec<RawMessage> {
        if !self.responses.is_empty() {
            return self.responses.clone();
        }
        self.response
            .as_ref()
            .map(|text| vec![RawMessage::partner(text.clone())])
            .unwrap_or_default()
    }
}

/// One prior turn, sent as context for reply suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub sender: String,
    pub message: String,
}

/// Body of `POST /generate_recommendations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub user_input: String,
    pub conversation_history: Vec<HistoryEntry>,
    pub language: Language,
    pub session_id: String,
}

/// Response of `POST /generate_recommendations`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationReply {
    #[serde(default)]
    pub recommended_answers: Vec<RecommendedAnswer>,
}

// ── Error ─────────────────────────────────────────────────────────────────────

/// Errors returned by the conversation API port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiPortError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Transport(String),

    /// The client-side timeout elapsed.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The server answered with a non-2xx status.
    #[error("API request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    /// The body could not be decoded into the expected shape.
    #[error("Invalid response from API: {0}")]
    InvalidResponse(String),
}

impl ApiPortError {
    /// Transport failures and timeouts; these were already retried by the client.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }

    /// Replies the server embedded in an error body, if any.
    ///
    /// The server answers a failed `/message` with a 500 whose body still
    /// carries a `responses` list holding an apology notice.
    #[must_use]
    pub fn fallback_replies(&self) -> Vec<RawMessage> {
        match self {
            Self::Http { body, .. } => serde_json::from_str::<MessageReply>(body)
                .map(|r| r.responses)
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Short notice suitable for showing in the transcript.
    #[must_use]
    pub fn user_notice(&self) -> String {
        match self {
            Self::Transport(_) | Self::Timeout(_) => {
                "Connection problem: the server could not be reached. Please try again.".into()
            }
            Self::Http { status, .. } => format!("The server rejected the request ({status})."),
            Self::InvalidResponse(_) => "The server sent a reply that could not be read.".into(),
        }
    }
}

// ── Port trait ────────────────────────────────────────────────────────────────

/// Port for the conversation HTTP API.
///
/// Implemented by `ConversationClient` in `debate-api`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationApiPort: Send + Sync {
    /// Open a debate and return the opening message.
    async fn start(&self, request: &StartRequest) -> Result<StartReply, ApiPortError>;

    /// Send one user turn and return the bot replies.
    async fn send_message(&self, request: &MessageRequest) -> Result<MessageReply, ApiPortError>;

    /// Drop server-side history for the session.
    async fn reset(&self, session_id: &str) -> Result<(), ApiPortError>;

    /// Ask for reply suggestions.
    async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationReply, ApiPortError>;
}
