//! Speech ports.
//!
//! Two directions meet here:
//!
//! - [`SpeechSynthesisPort`] is the upstream `generate_speech` call that turns
//!   text into encoded audio. The cloud speech adapter consumes it.
//! - [`SpeechRequestPort`] is how the conversation controller asks the voice
//!   layer to say something. The voice coordinator implements it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::conversation_api::ApiPortError;
use crate::domain::Language;

/// Body of `POST /generate_speech`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub sender: String,
    pub language: Language,
}

/// Encoded audio returned by the synthesis endpoint, normalized to bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    /// MIME type reported by the server (`audio/mpeg` when unknown).
    pub mime_type: String,
}

impl SynthesizedAudio {
    pub const DEFAULT_MIME: &'static str = "audio/mpeg";

    pub fn new(bytes: Vec<u8>, mime_type: Option<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.unwrap_or_else(|| Self::DEFAULT_MIME.to_string()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Upstream text-to-speech over the conversation API.
#[async_trait]
pub trait SpeechSynthesisPort: Send + Sync {
    async fn generate_speech(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, ApiPortError>;
}

/// Fire-and-forget speech requests from the controller to the voice layer.
///
/// None of these calls report failure: the voice layer retries internally
/// and exposes problems only through its own status snapshot.
#[cfg_attr(test, mockall::automock)]
pub trait SpeechRequestPort: Send + Sync {
    /// Ask for `text` to be spoken.
    fn speak(&self, text: &str, sender: &str, language: Language);

    /// Stop current playback and drop everything queued.
    fn stop(&self);

    /// Record that the user performed a gesture that permits audio.
    fn set_user_interacted(&self);
}
