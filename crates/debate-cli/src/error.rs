//! CLI-specific error types and mappings.
//!
//! This module provides the error type for the terminal front-end and
//! mappings from `CoreError` to exit codes and user-facing messages.

use debate_core::CoreError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Core domain error.
    #[error("{0}")]
    Core(String),

    /// Invalid arguments or chat command.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (terminal closed, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Conversation API unreachable or misbehaving.
    #[error("Conversation API error: {0}")]
    Api(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Core(_) => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Api(_) => 69,      // EX_UNAVAILABLE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api(api_err) => Self::Api(api_err.to_string()),
            CoreError::Store(store_err) => Self::Io(store_err.to_string()),
            CoreError::Validation(msg) => Self::Arguments(msg),
            CoreError::InvalidMessage(e) => Self::Core(e.to_string()),
            CoreError::Internal(msg) => Self::Core(msg),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
