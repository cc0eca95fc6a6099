//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `reqwest` or audio types in any signature
//! - Wire DTOs mirror the conversation API field names exactly
//! - The voice layer is reached only through [`SpeechRequestPort`], so the
//!   controller never sees adapters, queues or health

pub mod conversation_api;
pub mod interaction_store;
pub mod speech;

use thiserror::Error;

pub use conversation_api::{
    ApiPortError, ConversationApiPort, HistoryEntry, MessageReply, MessageRequest,
    RecommendationReply, RecommendationRequest, StartReply, StartRequest,
};
pub use interaction_store::{InteractionStore, StoreError};
pub use speech::{SpeechRequestPort, SpeechSynthesisPort, SynthesisRequest, SynthesizedAudio};

use crate::domain::MessageValidationError;

/// Core error type for semantic domain errors.
///
/// This is the canonical error type returned by the conversation controller.
/// The CLI maps it to notices and exit codes.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Conversation API call failed.
    #[error(transparent)]
    Api(#[from] ApiPortError),

    /// Persisted client state could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A reply from the API was malformed.
    #[error(transparent)]
    InvalidMessage(#[from] MessageValidationError),

    /// Validation error (invalid input).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error (unexpected condition).
    #[error("Internal error: {0}")]
    Internal(String),
}
