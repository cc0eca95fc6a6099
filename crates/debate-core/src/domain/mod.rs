//! Domain types for the debate client.
//!
//! These types represent the conversation in the client's own terms,
//! independent of the HTTP wire format or the audio stack.

pub mod language;
pub mod message;
pub mod recommendation;

pub use language::{Language, UnknownLanguage};
pub use message::{
    ChatMessage, DEBATE_PARTNER, MessageId, MessageKind, MessageValidationError, RawMessage,
    SYSTEM_SENDER, USER_SENDER,
};
pub use recommendation::RecommendedAnswer;
