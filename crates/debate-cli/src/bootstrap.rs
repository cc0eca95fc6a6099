//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the terminal front-end. All concrete implementations are
//! instantiated here:
//! - Conversation API client (via debate-api)
//! - Audio output thread and both speech adapters (via debate-voice)
//! - Interaction-flag store (via debate-core)
//! - The conversation controller on top of the voice coordinator
//!
//! Command handlers receive the fully-composed `CliContext`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use debate_api::{ApiClientConfig, DefaultConversationClient};
use debate_core::{
    ConversationService, InteractionStore, JsonInteractionStore, MemoryInteractionStore, Settings,
};
use debate_voice::{
    AdapterKind, AudioSink, CloudSpeechAdapter, CoordinatorConfig, LocalSpeechAdapter, RodioSink,
    VoiceCoordinator,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CliError;

/// Fully composed application context for the chat loop.
pub struct CliContext {
    /// The conversation controller.
    pub conversation: Arc<ConversationService>,
    /// The voice coordinator shared with the controller.
    pub voice: VoiceCoordinator,
    /// Settings the context was built from.
    pub settings: Settings,
    shutdown: CancellationToken,
    recovery: JoinHandle<()>,
}

impl CliContext {
    /// Stop speech and background tasks.
    pub async fn shutdown(self) {
        self.voice.stop();
        self.shutdown.cancel();
        if let Err(e) = self.recovery.await {
            warn!(error = %e, "Health recovery task ended abnormally");
        }
    }
}

/// Bootstrap the terminal application.
///
/// Must be called inside a tokio runtime. The audio device is optional: when
/// it cannot be opened the cloud adapter reports itself unsupported and the
/// coordinator falls back to the local synthesizer.
pub fn bootstrap(settings: Settings) -> Result<CliContext> {
    let api_config = ApiClientConfig::new().with_base_url(settings.effective_api_base_url());
    let client = Arc::new(
        DefaultConversationClient::new(&api_config)
            .map_err(|e| CliError::Config(format!("cannot build API client: {e}")))?,
    );
    info!(url = %client.base_url(), "Conversation API configured");

    let sink: Option<Arc<dyn AudioSink>> = match RodioSink::spawn() {
        Ok(sink) => Some(Arc::new(sink)),
        Err(e) => {
            warn!(error = %e, "No audio output, cloud speech disabled");
            None
        }
    };
    let cloud = Arc::new(CloudSpeechAdapter::new(client.clone(), sink));
    let local = Arc::new(LocalSpeechAdapter::detect());
    match local.engine() {
        Some(engine) => debug!(%engine, "Local speech available"),
        None => debug!("Local speech unavailable"),
    }

    let store = interaction_store(&settings);
    let voice =
        VoiceCoordinator::with_interaction_store(CoordinatorConfig::default(), cloud, local, store)?;

    let preferred: AdapterKind = settings
        .effective_preferred_adapter()
        .parse()
        .map_err(CliError::Config)?;
    voice.set_preferred_adapter(preferred);

    let shutdown = CancellationToken::new();
    let recovery = voice.spawn_health_recovery(shutdown.clone());

    let conversation = Arc::new(ConversationService::new(
        client,
        Arc::new(voice.clone()),
        settings.effective_language(),
        settings.effective_muted(),
    ));

    Ok(CliContext {
        conversation,
        voice,
        settings,
        shutdown,
        recovery,
    })
}

/// Pick where the interaction flag lives.
///
/// Persistence is best effort: without a data directory the flag only
/// lasts for this run.
pub fn interaction_store(settings: &Settings) -> Arc<dyn InteractionStore> {
    if !settings.effective_persist_interaction() {
        debug!("Interaction flag kept in memory");
        return Arc::new(MemoryInteractionStore::default());
    }

    let store = match settings.data_dir.as_deref() {
        Some(dir) => Ok(JsonInteractionStore::in_dir(PathBuf::from(dir))),
        None => JsonInteractionStore::default_location(),
    };
    match store {
        Ok(store) => {
            debug!(path = %store.path().display(), "Interaction flag persisted");
            Arc::new(store)
        }
        Err(e) => {
            warn!(error = %e, "Cannot persist interaction flag, keeping it in memory");
            Arc::new(MemoryInteractionStore::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn test_no_persist_uses_memory_store() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_dir: Some(dir.path().display().to_string()),
            persist_interaction: Some(false),
            ..Settings::with_defaults()
        };
        let store = interaction_store(&settings);
        assert_ok!(store.mark_interacted());
        assert!(assert_ok!(store.load()));
        assert!(!dir.path().join("interaction.json").exists());
    }

    #[test]
    fn test_data_dir_store_writes_flag_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_dir: Some(dir.path().display().to_string()),
            ..Settings::with_defaults()
        };
        let store = interaction_store(&settings);
        assert!(!assert_ok!(store.load()));
        assert_ok!(store.mark_interacted());

        let reopened = interaction_store(&settings);
        assert!(assert_ok!(reopened.load()));
        assert!(dir.path().join("interaction.json").exists());
    }
}
