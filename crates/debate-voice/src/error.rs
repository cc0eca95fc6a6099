//! Voice playback error types.

use crate::adapter::AdapterKind;

/// Errors that can occur while producing or playing speech.
///
/// None of these reach `speak` callers. The coordinator retries them and
/// reflects the outcome in health and `last_error` only.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// The upstream synthesis call failed.
    #[error("Speech synthesis failed: {0}")]
    SynthesisError(String),

    /// Decoding or playing audio failed.
    #[error("Audio playback failed: {0}")]
    PlaybackError(String),

    /// Failed to open the audio output stream.
    #[error("Failed to open audio output stream: {0}")]
    OutputStreamError(String),

    /// The adapter cannot run on this system.
    #[error("{0} speech is not supported on this system")]
    Unsupported(AdapterKind),

    /// Neither adapter is supported and healthy enough to try.
    #[error("no adapter available")]
    NoAdapterAvailable,

    /// The synthesizer process failed to start or exited unsuccessfully.
    #[error("Synthesizer process failed: {0}")]
    ProcessError(String),

    /// The audio thread exited or stopped answering.
    #[error("Audio thread is no longer running")]
    AudioThreadDied,

    /// IO error while talking to a child process.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Playback was stopped before it completed.
    #[error("Voice operation cancelled")]
    Cancelled,

    /// No tokio runtime was available to drive playback.
    #[error("Voice coordinator must be created inside a tokio runtime")]
    NoRuntime,
}
