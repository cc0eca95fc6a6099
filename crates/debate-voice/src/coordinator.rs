//! Voice coordinator - the single owner of playback state.
//!
//! Callers only ever enqueue (`speak`), open the interaction gate, stop, or
//! read a status snapshot. One worker task drains the playback queue; it is
//! spawned on demand and exits when the queue is empty, so at most one
//! adapter call is ever in flight.
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. `stop()` bumps a generation counter and cancels the current
//! epoch token: a worker from an older generation notices on its next step
//! and exits without touching state.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use debate_core::{InteractionStore, Language, SpeechRequestPort};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::adapter::{AdapterKind, SpeechAdapter, SpeechRequest};
use crate::config::CoordinatorConfig;
use crate::error::VoiceError;
use crate::filter::is_system_notice;
use crate::health::HealthBook;
use crate::policy::{
    PlaybackEvent, PlaybackPhase, RetryDecision, next_retry, select_adapter, transition,
};
use crate::queue::{PendingAudioItem, PendingQueue};

// ── Status snapshot ────────────────────────────────────────────────

/// Read-only view of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceStatus {
    /// Some adapter is supported and not unavailable.
    pub available: bool,
    pub preferred_adapter: AdapterKind,
    /// Adapter of the in-flight attempt.
    pub current_adapter: Option<AdapterKind>,
    /// Adapter the next attempt would use.
    pub next_adapter: Option<AdapterKind>,
    pub cloud_supported: bool,
    pub local_supported: bool,
    pub user_interacted: bool,
    /// Items waiting in either queue.
    pub pending_audio: usize,
    pub is_playing: bool,
    pub phase: PlaybackPhase,
    pub last_error: Option<String>,
    pub health: HealthBook,
}

// ── Internal state ─────────────────────────────────────────────────

/// Stop handle for the one in-flight adapter call.
struct PlaybackHandle {
    token: CancellationToken,
}

impl PlaybackHandle {
    fn stop(self) {
        self.token.cancel();
    }
}

struct CoordinatorState {
    preferred: AdapterKind,
    /// Monotonic; flips once.
    user_interacted: bool,
    /// Set once the settle delay after the first gesture has elapsed.
    gate_open: bool,
    pending: PendingQueue,
    playback: VecDeque<PendingAudioItem>,
    phase: PlaybackPhase,
    worker_running: bool,
    current: Option<AdapterKind>,
    handle: Option<PlaybackHandle>,
    health: HealthBook,
    last_error: Option<String>,
    generation: u64,
    epoch: CancellationToken,
}

struct Inner {
    config: CoordinatorConfig,
    cloud: Arc<dyn SpeechAdapter>,
    local: Arc<dyn SpeechAdapter>,
    store: Option<Arc<dyn InteractionStore>>,
    runtime: Handle,
    state: Mutex<CoordinatorState>,
}

// ── Coordinator ────────────────────────────────────────────────────

/// Chooses an adapter, queues and serializes playback, retries and tracks
/// adapter health.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct VoiceCoordinator {
    inner: Arc<Inner>,
}

impl VoiceCoordinator {
    /// Create a coordinator. Must be called inside a tokio runtime.
    pub fn new(
        config: CoordinatorConfig,
        cloud: Arc<dyn SpeechAdapter>,
        local: Arc<dyn SpeechAdapter>,
    ) -> Result<Self, VoiceError> {
        Self::build(config, cloud, local, None)
    }

    /// Create a coordinator whose interaction gate is pre-seeded from, and
    /// persisted to, `store`.
    pub fn with_interaction_store(
        config: CoordinatorConfig,
        cloud: Arc<dyn SpeechAdapter>,
        local: Arc<dyn SpeechAdapter>,
        store: Arc<dyn InteractionStore>,
    ) -> Result<Self, VoiceError> {
        Self::build(config, cloud, local, Some(store))
    }

    fn build(
        config: CoordinatorConfig,
        cloud: Arc<dyn SpeechAdapter>,
        local: Arc<dyn SpeechAdapter>,
        store: Option<Arc<dyn InteractionStore>>,
    ) -> Result<Self, VoiceError> {
        let runtime = Handle::try_current().map_err(|_| VoiceError::NoRuntime)?;

        let interacted_before = match store.as_ref().map(|s| s.load()) {
            Some(Ok(flag)) => flag,
            Some(Err(e)) => {
                warn!(error = %e, "Could not read interaction flag, starting with gate closed");
                false
            }
            None => false,
        };
        if interacted_before {
            debug!("Interaction gate pre-seeded from earlier session");
        }

        let state = CoordinatorState {
            preferred: AdapterKind::default(),
            user_interacted: interacted_before,
            gate_open: interacted_before,
            pending: PendingQueue::new(config.max_pending_audio),
            playback: VecDeque::new(),
            phase: PlaybackPhase::Idle,
            worker_running: false,
            current: None,
            handle: None,
            health: HealthBook::default(),
            last_error: None,
            generation: 0,
            epoch: CancellationToken::new(),
        };

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                cloud,
                local,
                store,
                runtime,
                state: Mutex::new(state),
            }),
        })
    }

    /// Ask for `text` to be spoken. Fire-and-forget.
    ///
    /// Blank text and system notices are dropped. Before the first user
    /// gesture the item waits in the bounded pending queue; afterwards it
    /// joins the playback queue.
    pub fn speak(&self, text: &str, sender: &str, language: Language) {
        if is_system_notice(text, sender) {
            debug!(sender, "Skipping system notice");
            return;
        }
        let Some(item) = PendingAudioItem::new(text, sender, language) else {
            debug!(sender, "Skipping empty utterance");
            return;
        };

        {
            let mut s = self.inner.lock();
            if !s.user_interacted {
                let capacity = s.pending.capacity();
                match s.pending.push(item) {
                    Ok(()) => debug!(queue_len = s.pending.len(), "Queued audio until interaction"),
                    Err(dropped) => warn!(
                        capacity,
                        sender = %dropped.sender,
                        "Pending audio queue full, dropping newest item"
                    ),
                }
                return;
            }
            s.playback.push_back(item);
            debug!(queue_len = s.playback.len(), "Queued audio for playback");
        }
        self.inner.kick();
    }

    /// Record the first user gesture. Later calls are no-ops.
    ///
    /// After the settle delay, pending items younger than the TTL move to
    /// the front of the playback queue in arrival order.
    pub fn set_user_interacted(&self) {
        {
            let mut s = self.inner.lock();
            if s.user_interacted {
                return;
            }
            s.user_interacted = true;
        }
        info!("Interaction gate opened");

        if let Some(store) = &self.inner.store {
            if let Err(e) = store.mark_interacted() {
                warn!(error = %e, "Failed to persist interaction flag");
            }
        }

        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            sleep(inner.config.settle_delay).await;
            inner.release_pending();
        });
    }

    /// Stop playback and clear both queues.
    ///
    /// Takes effect before any later `speak`. Both adapters are told to stop
    /// whether or not they are playing.
    pub fn stop(&self) {
        let cleared = {
            let mut s = self.inner.lock();
            let cleared = s.pending.len() + s.playback.len();
            s.pending.clear();
            s.playback.clear();
            s.generation = s.generation.wrapping_add(1);
            s.epoch.cancel();
            s.epoch = CancellationToken::new();
            if let Some(handle) = s.handle.take() {
                handle.stop();
            }
            s.current = None;
            s.phase = transition(s.phase, PlaybackEvent::Stopped);
            cleared
        };
        self.inner.cloud.stop();
        self.inner.local.stop();
        debug!(cleared, "Voice playback stopped");
    }

    /// Change which adapter is tried first. Current playback continues.
    pub fn set_preferred_adapter(&self, adapter: AdapterKind) {
        let mut s = self.inner.lock();
        if s.preferred != adapter {
            s.preferred = adapter;
            info!(adapter = %adapter, "Preferred speech adapter changed");
        }
    }

    /// Zero both error counters. Queues are untouched.
    pub fn reset_health(&self) {
        self.inner.lock().health.reset();
        info!("Speech adapter health reset");
    }

    pub fn status(&self) -> VoiceStatus {
        let cloud_supported = self.inner.cloud.is_supported();
        let local_supported = self.inner.local.is_supported();
        let supported = |kind: AdapterKind| match kind {
            AdapterKind::Cloud => cloud_supported,
            AdapterKind::Local => local_supported,
        };

        let s = self.inner.lock();
        let next_adapter = select_adapter(s.preferred, &s.health, supported);
        VoiceStatus {
            available: next_adapter.is_some(),
            preferred_adapter: s.preferred,
            current_adapter: s.current,
            next_adapter,
            cloud_supported,
            local_supported,
            user_interacted: s.user_interacted,
            pending_audio: s.pending.len() + s.playback.len(),
            is_playing: s.phase.is_playing(),
            phase: s.phase,
            last_error: s.last_error.clone(),
            health: s.health,
        }
    }

    /// Spawn passive health recovery: every `health_decay_interval` each
    /// adapter forgets one consecutive error. Runs until `cancel` fires.
    pub fn spawn_health_recovery(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            let period = inner.config.health_decay_interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let mut s = inner.lock();
                        if s.health.decay_all() {
                            debug!(
                                cloud = ?s.health.cloud.state,
                                local = ?s.health.local.state,
                                "Speech adapter health recovered"
                            );
                        }
                    }
                    () = cancel.cancelled() => {
                        debug!("Health recovery stopped");
                        break;
                    }
                }
            }
        })
    }
}

impl SpeechRequestPort for VoiceCoordinator {
    fn speak(&self, text: &str, sender: &str, language: Language) {
        Self::speak(self, text, sender, language);
    }

    fn stop(&self) {
        Self::stop(self);
    }

    fn set_user_interacted(&self) {
        Self::set_user_interacted(self);
    }
}

// ── Worker ─────────────────────────────────────────────────────────

impl Inner {
    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn adapter(&self, kind: AdapterKind) -> &Arc<dyn SpeechAdapter> {
        match kind {
            AdapterKind::Cloud => &self.cloud,
            AdapterKind::Local => &self.local,
        }
    }

    /// Move fresh pending items ahead of the playback queue and start draining.
    fn release_pending(self: &Arc<Self>) {
        {
            let mut s = self.lock();
            let (fresh, expired) = s.pending.take_fresh(Instant::now(), self.config.pending_ttl);
            let moved = fresh.len();
            for item in fresh.into_iter().rev() {
                s.playback.push_front(item);
            }
            s.gate_open = true;
            if expired > 0 {
                warn!(expired, "Dropped expired pending audio");
            }
            debug!(moved, queue_len = s.playback.len(), "Pending audio released");
        }
        self.kick();
    }

    /// Start the worker unless one is running, the gate is closed or there
    /// is nothing to play.
    fn kick(self: &Arc<Self>) {
        let generation = {
            let mut s = self.lock();
            if s.worker_running || !s.gate_open || s.playback.is_empty() {
                return;
            }
            s.worker_running = true;
            s.generation
        };
        let worker = Arc::clone(self);
        self.runtime.spawn(async move {
            worker.drain(generation).await;
        });
    }

    /// A worker from before the last `stop()` is exiting.
    fn retire_stale_worker(self: &Arc<Self>) {
        self.lock().worker_running = false;
        self.kick();
    }

    async fn drain(self: Arc<Self>, generation: u64) {
        let epoch = self.lock().epoch.clone();

        loop {
            let item = {
                let mut s = self.lock();
                if s.generation != generation {
                    drop(s);
                    self.retire_stale_worker();
                    return;
                }
                let Some(item) = s.playback.pop_front() else {
                    s.phase = transition(s.phase, PlaybackEvent::QueueEmpty);
                    s.worker_running = false;
                    return;
                };
                s.phase = transition(s.phase, PlaybackEvent::Dequeued);
                item
            };

            if !self.play_with_retry(item, generation, &epoch).await {
                self.retire_stale_worker();
                return;
            }

            {
                let mut s = self.lock();
                if s.generation != generation {
                    drop(s);
                    self.retire_stale_worker();
                    return;
                }
                if s.playback.is_empty() {
                    s.phase = transition(s.phase, PlaybackEvent::QueueEmpty);
                    s.worker_running = false;
                    return;
                }
            }

            tokio::select! {
                biased;
                () = epoch.cancelled() => {}
                () = sleep(self.config.inter_item_delay) => {}
            }
        }
    }

    /// Play one item, retrying on a freshly selected adapter.
    ///
    /// Returns `false` if `stop()` interrupted it; `true` once the item has
    /// been played or dropped.
    async fn play_with_retry(
        &self,
        mut item: PendingAudioItem,
        generation: u64,
        epoch: &CancellationToken,
    ) -> bool {
        loop {
            let cloud_supported = self.cloud.is_supported();
            let local_supported = self.local.is_supported();

            let (kind, token) = {
                let mut s = self.lock();
                if s.generation != generation {
                    return false;
                }
                let selected = select_adapter(s.preferred, &s.health, |kind| match kind {
                    AdapterKind::Cloud => cloud_supported,
                    AdapterKind::Local => local_supported,
                });
                let Some(kind) = selected else {
                    s.phase = transition(s.phase, PlaybackEvent::NoAdapter);
                    s.last_error = Some(VoiceError::NoAdapterAvailable.to_string());
                    error!(sender = %item.sender, "No speech adapter available, dropping item");
                    return true;
                };
                s.phase = transition(s.phase, PlaybackEvent::Selected);
                s.current = Some(kind);
                if let Some(old) = s.handle.take() {
                    old.stop();
                }
                let token = epoch.child_token();
                s.handle = Some(PlaybackHandle {
                    token: token.clone(),
                });
                (kind, token)
            };

            let request = SpeechRequest {
                text: item.text.clone(),
                sender: item.sender.clone(),
                language: item.language,
            };
            let adapter = Arc::clone(self.adapter(kind));
            debug!(adapter = %kind, attempt = item.retry_count + 1, "Attempting playback");

            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => None,
                result = adapter.speak(&request) => Some(result),
            };
            let Some(result) = outcome else {
                return false;
            };

            let delay = {
                let mut s = self.lock();
                if s.generation != generation {
                    return false;
                }
                s.handle = None;
                s.current = None;
                let health = s.health.get_mut(kind);
                match result {
                    Ok(()) => {
                        health.record_success();
                        s.phase = transition(s.phase, PlaybackEvent::Succeeded);
                        debug!(adapter = %kind, "Playback complete");
                        return true;
                    }
                    Err(e) => {
                        health.record_failure();
                        let consecutive_errors = health.consecutive_errors;
                        match next_retry(
                            item.retry_count,
                            self.config.max_retries,
                            self.config.retry_delay,
                        ) {
                            RetryDecision::Retry { delay } => {
                                warn!(
                                    adapter = %kind,
                                    attempt = item.retry_count + 1,
                                    consecutive_errors,
                                    error = %e,
                                    "Speech attempt failed, retrying"
                                );
                                s.phase = transition(
                                    s.phase,
                                    PlaybackEvent::Failed { will_retry: true },
                                );
                                delay
                            }
                            RetryDecision::GiveUp => {
                                error!(
                                    adapter = %kind,
                                    attempts = item.retry_count + 1,
                                    error = %e,
                                    "Speech retries exhausted, dropping item"
                                );
                                s.last_error = Some(e.to_string());
                                s.phase = transition(
                                    s.phase,
                                    PlaybackEvent::Failed { will_retry: false },
                                );
                                return true;
                            }
                        }
                    }
                }
            };

            if !backoff(delay, epoch).await {
                return false;
            }
            item.retry_count += 1;

            let mut s = self.lock();
            if s.generation != generation {
                return false;
            }
            s.phase = transition(s.phase, PlaybackEvent::BackoffElapsed);
        }
    }
}

/// Sleep for `delay`; `false` if `epoch` was cancelled first.
async fn backoff(delay: Duration, epoch: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = epoch.cancelled() => false,
        () = sleep(delay) => true,
    }
}
