#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

// Used by the binary only
use dotenvy as _;
use tracing_subscriber as _;

#[cfg(test)]
use async_trait as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

// Re-export primary types for convenient access
pub use bootstrap::{CliContext, bootstrap};
pub use commands::ChatCommand;
pub use error::CliError;
pub use handlers::chat::{ChatSession, Flow};
pub use parser::Cli;
