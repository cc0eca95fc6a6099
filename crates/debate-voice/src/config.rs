//! Coordinator configuration.

use std::time::Duration;

/// Tunables for [`VoiceCoordinator`](crate::VoiceCoordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Capacity of the pre-interaction queue; newest items are dropped beyond it.
    pub max_pending_audio: usize,
    /// Retries per item after the first attempt.
    pub max_retries: u32,
    /// Base of the linear retry back-off.
    pub retry_delay: Duration,
    /// Pause between two queued items.
    pub inter_item_delay: Duration,
    /// Wait between the first user gesture and draining the pending queue.
    pub settle_delay: Duration,
    /// Pending items older than this are dropped when the gate opens.
    pub pending_ttl: Duration,
    /// How often passive health recovery forgets one error per adapter.
    pub health_decay_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_pending_audio: 10,
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            inter_item_delay: Duration::from_millis(500),
            settle_delay: Duration::from_millis(100),
            pending_ttl: Duration::from_secs(120),
            health_decay_interval: Duration::from_secs(30),
        }
    }
}

impl CoordinatorConfig {
    #[must_use]
    pub const fn with_max_pending_audio(mut self, max: usize) -> Self {
        self.max_pending_audio = max;
        self
    }

    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_inter_item_delay(mut self, delay: Duration) -> Self {
        self.inter_item_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_pending_ttl(mut self, ttl: Duration) -> Self {
        self.pending_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_health_decay_interval(mut self, interval: Duration) -> Self {
        self.health_decay_interval = interval;
        self
    }
}
