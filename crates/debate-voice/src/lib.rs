#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod adapter;
pub mod audio_thread;
pub mod cloud;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod health;
pub mod local;
pub mod policy;
pub mod queue;

// Re-export key types for convenience
pub use adapter::{AdapterKind, SpeechAdapter, SpeechRequest};
pub use audio_thread::RodioSink;
pub use cloud::{AudioSink, CloudSpeechAdapter};
pub use config::CoordinatorConfig;
pub use coordinator::{VoiceCoordinator, VoiceStatus};
pub use error::VoiceError;
pub use health::{HealthBook, HealthState, ServiceHealth};
pub use local::{LocalSpeechAdapter, SynthesizerEngine};
pub use policy::{PlaybackEvent, PlaybackPhase, RetryDecision};

