//! Settings domain types and validation.
//!
//! This module contains the client settings assembled by the composition
//! root from flags, environment and `.env`. These are pure domain types with
//! no infrastructure dependencies.

use serde::{Deserialize, Serialize};

use crate::domain::Language;

/// Default base URL of the conversation API.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/chat";

/// Speech back-end names accepted for `preferred_adapter`.
pub const ADAPTER_NAMES: [&str; 2] = ["cloud", "local"];

/// Client settings.
///
/// All fields are optional to support partial configuration and graceful
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the conversation API (`.../api/chat`).
    pub api_base_url: Option<String>,

    /// Debate language.
    pub language: Option<Language>,

    /// Speech back-end tried first (`"cloud"` or `"local"`).
    pub preferred_adapter: Option<String>,

    /// Start with speech muted.
    pub muted: Option<bool>,

    /// Directory for persisted client state.
    pub data_dir: Option<String>,

    /// Persist the interaction flag across runs.
    pub persist_interaction: Option<bool>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            api_base_url: Some(DEFAULT_API_BASE_URL.to_string()),
            language: Some(Language::English),
            preferred_adapter: Some("cloud".to_string()),
            muted: Some(false),
            data_dir: None,
            persist_interaction: Some(true),
        }
    }

    #[must_use]
    pub fn effective_api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    #[must_use]
    pub fn effective_language(&self) -> Language {
        self.language.unwrap_or_default()
    }

    #[must_use]
    pub fn effective_preferred_adapter(&self) -> &str {
        self.preferred_adapter.as_deref().unwrap_or("cloud")
    }

    #[must_use]
    pub fn effective_muted(&self) -> bool {
        self.muted.unwrap_or(false)
    }

    #[must_use]
    pub fn effective_persist_interaction(&self) -> bool {
        self.persist_interaction.unwrap_or(true)
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("API base URL must start with http:// or https://, got '{0}'")]
    InvalidApiUrl(String),

    #[error("Unknown voice back-end '{0}' (expected 'cloud' or 'local')")]
    UnknownVoice(String),

    #[error("Data directory cannot be empty")]
    EmptyDataDir,
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(url) = settings.api_base_url.as_deref() {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SettingsError::InvalidApiUrl(url.to_string()));
        }
    }

    if let Some(voice) = settings.preferred_adapter.as_deref() {
        if !ADAPTER_NAMES.contains(&voice) {
            return Err(SettingsError::UnknownVoice(voice.to_string()));
        }
    }

    if settings
        .data_dir
        .as_ref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(SettingsError::EmptyDataDir);
    }

    Ok(())
}
