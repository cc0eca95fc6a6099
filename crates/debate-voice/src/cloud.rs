//! Cloud speech adapter: remote synthesis, local playback.
//!
//! A failed synthesis call and a failed playback are the same failure to
//! the coordinator; both count against the cloud adapter's health.

use std::sync::Arc;

use async_trait::async_trait;
use debate_core::{SpeechSynthesisPort, SynthesisRequest, SynthesizedAudio};
use tracing::debug;

use crate::adapter::{AdapterKind, SpeechAdapter, SpeechRequest};
use crate::error::VoiceError;

/// Somewhere to play encoded audio.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Whether an output device is usable.
    fn is_available(&self) -> bool;

    /// Decode and play `audio`, resolving when playback has finished.
    async fn play(&self, audio: SynthesizedAudio) -> Result<(), VoiceError>;

    /// Stop current playback. Safe when idle.
    fn stop(&self);
}

/// Speech through `/generate_speech`.
pub struct CloudSpeechAdapter {
    synth: Arc<dyn SpeechSynthesisPort>,
    sink: Option<Arc<dyn AudioSink>>,
}

impl CloudSpeechAdapter {
    /// Without a sink the adapter reports itself unsupported.
    pub fn new(synth: Arc<dyn SpeechSynthesisPort>, sink: Option<Arc<dyn AudioSink>>) -> Self {
        Self { synth, sink }
    }
}

#[async_trait]
impl SpeechAdapter for CloudSpeechAdapter {
    fn is_supported(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| s.is_available())
    }

    async fn speak(&self, request: &SpeechRequest) -> Result<(), VoiceError> {
        let sink = self
            .sink
            .as_ref()
            .ok_or(VoiceError::Unsupported(AdapterKind::Cloud))?;

        let audio = self
            .synth
            .generate_speech(&SynthesisRequest {
                text: request.text.clone(),
                sender: request.sender.clone(),
                language: request.language,
            })
            .await
            .map_err(|e| VoiceError::SynthesisError(e.to_string()))?;

        debug!(bytes = audio.bytes.len(), mime = %audio.mime_type, "Playing synthesized speech");
        sink.play(audio).await
    }

    fn stop(&self) {
        if let Some(sink) = &self.sink {
            sink.stop();
        }
    }

    fn name(&self) -> &str {
        "cloud"
    }
}
