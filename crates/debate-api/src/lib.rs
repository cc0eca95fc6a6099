#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

mod client;
mod config;
mod error;
mod http;
mod port;
mod speech;

// ============================================================================
// Public API
// ============================================================================

// Client
pub use client::{ConversationClient, DefaultConversationClient};

// Configuration
pub use config::ApiClientConfig;

// Errors
pub use error::{ApiError, ApiResult};

// HTTP seam
pub use http::{HttpBackend, RawResponse, ReqwestBackend};

