//! Chat-loop commands.
//!
//! A line starting with `/` is a command; anything else is a debate turn.

use std::fmt;

use debate_core::Language;
use debate_voice::AdapterKind;

use crate::error::CliError;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Send a debate message.
    Say(String),
    /// `/lang <en|de>`
    Language(Language),
    /// `/mute`
    Mute,
    /// `/unmute`
    Unmute,
    /// `/voice <cloud|local>`
    Voice(AdapterKind),
    /// `/status`
    Status,
    /// `/health-reset`
    HealthReset,
    /// `/suggest`
    Suggest,
    /// `/use <n>`: send the n-th suggestion (1-based).
    UseSuggestion(usize),
    /// `/reset`
    Reset,
    /// `/stop`
    Stop,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
}

impl ChatCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CliError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Self::Say(line.to_string())));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let arg = parts.next();

        let command = match (name.as_str(), arg) {
            ("lang" | "language", Some(code)) => Self::Language(
                code.parse()
                    .map_err(|e: debate_core::UnknownLanguage| CliError::Arguments(e.to_string()))?,
            ),
            ("voice", Some(kind)) => Self::Voice(kind.parse().map_err(CliError::Arguments)?),
            ("use", Some(n)) => Self::UseSuggestion(
                n.parse::<usize>()
                    .ok()
                    .filter(|&index| index > 0)
                    .ok_or_else(|| CliError::Arguments(format!("'{n}' is not a suggestion number")))?,
            ),
            ("lang" | "language" | "voice" | "use", None) => {
                return Err(CliError::Arguments(format!("/{name} needs an argument")));
            }
            ("mute", _) => Self::Mute,
            ("unmute", _) => Self::Unmute,
            ("status", _) => Self::Status,
            ("health-reset", _) => Self::HealthReset,
            ("suggest", _) => Self::Suggest,
            ("reset", _) => Self::Reset,
            ("stop", _) => Self::Stop,
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            _ => {
                return Err(CliError::Arguments(format!(
                    "unknown command '/{name}', try /help"
                )));
            }
        };
        Ok(Some(command))
    }
}

/// Help text for the chat loop.
pub struct Help;

impl fmt::Display for Help {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const ROWS: [(&str, &str); 12] = [
            ("/lang <en|de>", "switch the debate language"),
            ("/mute, /unmute", "turn spoken replies off or on"),
            ("/voice <cloud|local>", "choose the speech back-end tried first"),
            ("/status", "show voice status and adapter health"),
            ("/health-reset", "forget recorded speech failures"),
            ("/suggest", "ask for reply suggestions"),
            ("/use <n>", "send suggestion n"),
            ("/reset", "start the conversation over"),
            ("/stop", "stop speaking"),
            ("/help", "show this help"),
            ("/quit", "leave"),
            ("<text>", "send a debate message"),
        ];
        for (usage, what) in ROWS {
            writeln!(f, "  {usage:<22} {what}")?;
        }
        Ok(())
    }
}
