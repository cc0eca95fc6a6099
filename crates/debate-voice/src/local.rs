//! Local speech adapter: the system synthesizer as a child process.
//!
//! The synthesizer binary is probed once at construction. Each utterance
//! runs one process that plays directly to the default device; dropping the
//! `speak` future or calling `stop` kills it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use debate_core::Language;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::adapter::{AdapterKind, SpeechAdapter, SpeechRequest};
use crate::error::VoiceError;

/// Supported system synthesizers, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesizerEngine {
    EspeakNg,
    Espeak,
    /// macOS `say`.
    Say,
}

impl SynthesizerEngine {
    pub const PROBE_ORDER: [Self; 3] = [Self::EspeakNg, Self::Espeak, Self::Say];

    #[must_use]
    pub const fn binary(self) -> &'static str {
        match self {
            Self::EspeakNg => "espeak-ng",
            Self::Espeak => "espeak",
            Self::Say => "say",
        }
    }

    /// Voice matching the requested language.
    #[must_use]
    pub const fn voice_for(self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Say, Language::English) => "Samantha",
            (Self::Say, Language::German) => "Anna",
            (Self::EspeakNg | Self::Espeak, Language::English) => "en",
            (Self::EspeakNg | Self::Espeak, Language::German) => "de",
        }
    }

    fn args(self, language: Language, text: &str) -> Vec<String> {
        let voice = self.voice_for(language).to_string();
        match self {
            Self::EspeakNg | Self::Espeak => {
                vec!["-v".into(), voice, "--".into(), text.to_string()]
            }
            Self::Say => vec!["-v".into(), voice, text.to_string()],
        }
    }
}

impl fmt::Display for SynthesizerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// Speech through the system synthesizer.
pub struct LocalSpeechAdapter {
    synthesizer: Option<(SynthesizerEngine, PathBuf)>,
    current: Mutex<Option<CancellationToken>>,
}

impl LocalSpeechAdapter {
    /// Probe `PATH` for a synthesizer.
    pub fn detect() -> Self {
        let found = SynthesizerEngine::PROBE_ORDER
            .into_iter()
            .find_map(|engine| which::which(engine.binary()).ok().map(|p| (engine, p)));
        match &found {
            Some((engine, path)) => {
                debug!(%engine, path = %path.display(), "Found system synthesizer");
            }
            None => debug!("No system synthesizer found"),
        }
        Self {
            synthesizer: found,
            current: Mutex::new(None),
        }
    }

    /// Use a specific synthesizer binary.
    pub fn with_program(engine: SynthesizerEngine, path: impl AsRef<Path>) -> Self {
        Self {
            synthesizer: Some((engine, path.as_ref().to_path_buf())),
            current: Mutex::new(None),
        }
    }

    /// An adapter that reports itself unsupported.
    pub fn unsupported() -> Self {
        Self {
            synthesizer: None,
            current: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> Option<SynthesizerEngine> {
        self.synthesizer.as_ref().map(|(engine, _)| *engine)
    }

    fn replace_current(&self, token: Option<CancellationToken>) {
        let previous = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, token)
        };
        if let Some(previous) = previous {
            previous.cancel();
        }
    }
}

#[async_trait]
impl SpeechAdapter for LocalSpeechAdapter {
    fn is_supported(&self) -> bool {
        self.synthesizer.is_some()
    }

    async fn speak(&self, request: &SpeechRequest) -> Result<(), VoiceError> {
        let (engine, program) = self
            .synthesizer
            .as_ref()
            .ok_or(VoiceError::Unsupported(AdapterKind::Local))?;

        let token = CancellationToken::new();
        self.replace_current(Some(token.clone()));

        let mut child = Command::new(program)
            .args(engine.args(request.language, &request.text))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VoiceError::ProcessError(format!("failed to start {engine}: {e}")))?;
        debug!(%engine, voice = engine.voice_for(request.language), "Synthesizer started");

        // The child is killed on drop when cancelled.
        tokio::select! {
            biased;
            () = token.cancelled() => Err(VoiceError::Cancelled),
            status = child.wait() => match status {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(VoiceError::ProcessError(format!("{engine} exited with {status}"))),
                Err(e) => Err(VoiceError::Io(e)),
            },
        }
    }

    fn stop(&self) {
        self.replace_current(None);
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str) -> SpeechRequest {
        SpeechRequest {
            text: text.into(),
            sender: "Debate Partner".into(),
            language: Language::German,
        }
    }

    #[test]
    fn test_voice_selection() {
        assert_eq!(SynthesizerEngine::Say.voice_for(Language::English), "Samantha");
        assert_eq!(SynthesizerEngine::Say.voice_for(Language::German), "Anna");
        assert_eq!(SynthesizerEngine::EspeakNg.voice_for(Language::German), "de");
        assert_eq!(SynthesizerEngine::Espeak.voice_for(Language::English), "en");
    }

    #[test]
    fn test_espeak_args_end_options() {
        let args = SynthesizerEngine::EspeakNg.args(Language::English, "-5 degrees");
        assert_eq!(args, vec!["-v", "en", "--", "-5 degrees"]);
    }

    #[tokio::test]
    async fn test_unsupported_adapter() {
        let adapter = LocalSpeechAdapter::unsupported();
        assert!(!adapter.is_supported());
        adapter.stop();
        let err = tokio_test::assert_err!(adapter.speak(&request("Hallo")).await);
        assert!(matches!(err, VoiceError::Unsupported(AdapterKind::Local)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_exit_status_is_reported() {
        // `true`/`false` ignore their arguments and exit 0/1.
        let ok = LocalSpeechAdapter::with_program(SynthesizerEngine::Say, "true");
        tokio_test::assert_ok!(ok.speak(&request("Hallo")).await);

        let failing = LocalSpeechAdapter::with_program(SynthesizerEngine::Say, "false");
        assert!(matches!(
            failing.speak(&request("Hallo")).await,
            Err(VoiceError::ProcessError(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_binary_fails_to_start() {
        let adapter = LocalSpeechAdapter::with_program(
            SynthesizerEngine::EspeakNg,
            "/nonexistent/espeak-ng",
        );
        assert!(adapter.is_supported());
        assert!(matches!(
            adapter.speak(&request("Hallo")).await,
            Err(VoiceError::ProcessError(_))
        ));
    }
}
