#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod persistence;
pub mod ports;
pub mod services;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    ChatMessage, DEBATE_PARTNER, Language, MessageId, MessageKind, MessageValidationError,
    RawMessage, RecommendedAnswer, SYSTEM_SENDER, USER_SENDER, UnknownLanguage,
};
pub use persistence::{JsonInteractionStore, MemoryInteractionStore, default_data_dir};
pub use ports::{
    ApiPortError, ConversationApiPort, CoreError, HistoryEntry, InteractionStore, MessageReply,
    MessageRequest, RecommendationReply, RecommendationRequest, SpeechRequestPort,
    SpeechSynthesisPort, StartReply, StartRequest, StoreError, SynthesisRequest,
    SynthesizedAudio,
};
pub use services::{ChatSnapshot, ConversationService};
pub use settings::{DEFAULT_API_BASE_URL, Settings, SettingsError, validate_settings};

