//! Command handlers for the terminal front-end.
//!
//! Handlers receive the composed `CliContext` from bootstrap and drive the
//! conversation controller and voice coordinator through it.

pub mod chat;
