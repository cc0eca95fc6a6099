//! Conversation language.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Language of the debate.
///
/// The API accepts exactly two values. English is the primary language and
/// the default; German is the secondary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    /// Primary language (`"en"`).
    #[default]
    #[serde(rename = "en")]
    English,
    /// Secondary language (`"de"`).
    #[serde(rename = "de")]
    German,
}

/// Returned when a language code is not one of the supported values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported language '{0}' (expected 'en' or 'de')")]
pub struct UnknownLanguage(pub String);

impl Language {
    /// ISO 639-1 code used on the wire.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::German => "de",
        }
    }

    /// Name of the language in that language, for notices.
    #[must_use]
    pub const fn native_name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::German => "Deutsch",
        }
    }

    #[must_use]
    pub const fn is_primary(self) -> bool {
        matches!(self, Self::English)
    }

    /// Parse a language code, accepting a few common spellings.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en-gb" | "english" => Some(Self::English),
            "de" | "de-de" | "german" | "deutsch" => Some(Self::German),
            _ => None,
        }
    }

    /// Notice shown locally when the user switches to this language.
    ///
    /// The notice is phrased in the new language. The voice layer treats
    /// these texts as system notices and never speaks them.
    #[must_use]
    pub const fn switch_notice(self) -> &'static str {
        match self {
            Self::English => "Language switched to English.",
            Self::German => "Sprache auf Deutsch umgestellt.",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}
