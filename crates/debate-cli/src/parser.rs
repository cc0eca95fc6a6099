//! Command-line arguments.
//!
//! Every option falls back to a `DEBATE_*` environment variable, which may
//! also come from a `.env` file loaded before parsing.

use clap::Parser;
use debate_core::{Language, Settings, validate_settings};

use crate::error::CliError;

/// Voice-enabled debate chat in the terminal.
#[derive(Debug, Parser)]
#[command(name = "debate")]
#[command(about = "Debate a chatbot in the terminal, with spoken replies")]
#[command(version)]
pub struct Cli {
    /// Base URL of the conversation API
    #[arg(long = "api-url", env = "DEBATE_API_URL")]
    pub api_url: Option<String>,

    /// Debate language (en or de)
    #[arg(short = 'l', long, env = "DEBATE_LANGUAGE")]
    pub language: Option<String>,

    /// Speech back-end tried first (cloud or local)
    #[arg(long, env = "DEBATE_VOICE")]
    pub voice: Option<String>,

    /// Directory for persisted client state
    #[arg(long = "data-dir", env = "DEBATE_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Start with speech muted
    #[arg(long)]
    pub muted: bool,

    /// Do not remember the first interaction across runs
    #[arg(long = "no-persist")]
    pub no_persist: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    /// Merge the arguments over the default settings and validate the result.
    pub fn settings(&self) -> Result<Settings, CliError> {
        let mut settings = Settings::with_defaults();

        if let Some(url) = &self.api_url {
            settings.api_base_url = Some(url.trim().to_string());
        }
        if let Some(code) = &self.language {
            let language: Language = code
                .parse()
                .map_err(|e: debate_core::UnknownLanguage| CliError::Config(e.to_string()))?;
            settings.language = Some(language);
        }
        if let Some(voice) = &self.voice {
            settings.preferred_adapter = Some(voice.trim().to_ascii_lowercase());
        }
        if self.data_dir.is_some() {
            settings.data_dir.clone_from(&self.data_dir);
        }
        if self.muted {
            settings.muted = Some(true);
        }
        if self.no_persist {
            settings.persist_interaction = Some(false);
        }

        validate_settings(&settings).map_err(|e| CliError::Config(e.to_string()))?;
        Ok(settings)
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub const fn default_log_filter(&self) -> &'static str {
        if self.verbose { "debate=debug" } else { "debate=info" }
    }
}
