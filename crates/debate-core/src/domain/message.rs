//! Chat messages and validation of bot replies received over the wire.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Sender label the API uses for the main debate bot.
pub const DEBATE_PARTNER: &str = "Debate Partner";

/// Sender label for messages typed by the user.
pub const USER_SENDER: &str = "You";

/// Sender label for locally generated notices.
pub const SYSTEM_SENDER: &str = "System";

/// Client-side identifier of a chat message.
///
/// Assigned when a message enters chat state; the API has no message ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    /// The debate partner bot.
    Partner,
    /// Philosopher or psychologist moderator bots.
    Moderator,
    /// Notices (errors, language switches). Never spoken.
    System,
}

impl MessageKind {
    /// Parse the `type` field of a bot reply.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "partner" | "bot" => Some(Self::Partner),
            "moderator" => Some(Self::Moderator),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    /// Infer the kind from a sender label when the reply carries no `type`.
    fn infer_from_sender(sender: &str) -> Self {
        if sender.eq_ignore_ascii_case(SYSTEM_SENDER) {
            Self::System
        } else if sender.to_ascii_lowercase().contains("moderator") {
            Self::Moderator
        } else {
            Self::Partner
        }
    }
}

/// A message in chat state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: String,
    pub text: String,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(sender: impl Into<String>, text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            id: MessageId::new(),
            sender: sender.into(),
            text: text.into(),
            kind,
            timestamp: Utc::now(),
        }
    }

    /// A message typed by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(USER_SENDER, text, MessageKind::User)
    }

    /// A message from the debate partner (opening message, single replies).
    pub fn partner(text: impl Into<String>) -> Self {
        Self::new(DEBATE_PARTNER, text, MessageKind::Partner)
    }

    /// A local notice.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(SYSTEM_SENDER, text, MessageKind::System)
    }

    /// Whether this message came from one of the bots.
    #[must_use]
    pub const fn is_bot(&self) -> bool {
        matches!(self.kind, MessageKind::Partner | MessageKind::Moderator)
    }
}

/// Errors for bot replies that cannot enter chat state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageValidationError {
    #[error("Reply is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Reply text is empty")]
    EmptyText,

    #[error("Unknown reply type '{0}'")]
    UnknownKind(String),

    #[error("Unparseable timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

/// One bot reply exactly as the API sent it.
///
/// Every field is optional on the wire; [`RawMessage::validate`] decides
/// whether the reply may become a [`ChatMessage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl RawMessage {
    /// A partner reply with only text, as produced by single-`response` payloads.
    pub fn partner(text: impl Into<String>) -> Self {
        Self {
            sender: Some(DEBATE_PARTNER.to_string()),
            message: Some(text.into()),
            kind: Some("partner".to_string()),
            timestamp: None,
        }
    }

    /// Validate the reply and convert it into a chat message.
    pub fn validate(&self) -> Result<ChatMessage, MessageValidationError> {
        let text = self
            .message
            .as_deref()
            .ok_or(MessageValidationError::MissingField("message"))?
            .trim();
        if text.is_empty() {
            return Err(MessageValidationError::EmptyText);
        }

        let sender = self
            .sender
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(MessageValidationError::MissingField("sender"))?;

        let kind = match self.kind.as_deref() {
            Some(k) => {
                MessageKind::parse(k).ok_or_else(|| MessageValidationError::UnknownKind(k.into()))?
            }
            None => MessageKind::infer_from_sender(sender),
        };

        let timestamp = match self.timestamp.as_deref() {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| MessageValidationError::InvalidTimestamp {
                    value: raw.to_string(),
                    reason: e.to_string(),
                })?,
            None => Utc::now(),
        };

        Ok(ChatMessage {
            id: MessageId::new(),
            sender: sender.to_string(),
            text: text.to_string(),
            kind,
            timestamp,
        })
    }
}
