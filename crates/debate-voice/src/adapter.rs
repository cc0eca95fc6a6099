//! Speech adapter abstraction.
//!
//! Both back-ends expose the same small capability surface so the
//! coordinator can pick either one per attempt, and tests can script them.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use debate_core::Language;
use serde::{Deserialize, Serialize};

use crate::error::VoiceError;

/// Which of the two speech back-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// Remote synthesis over the conversation API, played locally.
    #[default]
    Cloud,
    /// On-device system synthesizer.
    Local,
}

impl AdapterKind {
    pub const ALL: [Self; 2] = [Self::Cloud, Self::Local];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::Local => "local",
        }
    }

    /// The other adapter.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Cloud => Self::Local,
            Self::Local => Self::Cloud,
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloud" | "remote" => Ok(Self::Cloud),
            "local" | "system" => Ok(Self::Local),
            other => Err(format!("unknown speech adapter '{other}' (expected cloud or local)")),
        }
    }
}

/// One utterance handed to an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub sender: String,
    pub language: Language,
}

/// A speech back-end.
///
/// `speak` resolves when playback has finished. Dropping the future must
/// abandon playback; `stop` must be safe to call when idle.
#[async_trait]
pub trait SpeechAdapter: Send + Sync {
    /// Whether the back-end can run at all on this system.
    fn is_supported(&self) -> bool;

    /// Synthesize and play `request`, resolving when playback completes.
    async fn speak(&self, request: &SpeechRequest) -> Result<(), VoiceError>;

    /// Stop any playback in progress.
    fn stop(&self);

    /// Short label for logs.
    fn name(&self) -> &str;
}
