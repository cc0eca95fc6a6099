//! Pure playback decisions.
//!
//! The coordinator's async loop only sequences these functions: which
//! adapter to try, whether to retry and how long to wait, and how the
//! playback phase moves. Nothing here touches time, locks or adapters.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapter::AdapterKind;
use crate::health::HealthBook;

// ── Adapter selection ──────────────────────────────────────────────

/// Pick the adapter for the next attempt.
///
/// The preferred adapter wins if it is usable and supported, otherwise the
/// other one under the same condition. `None` means no adapter is available.
pub fn select_adapter(
    preferred: AdapterKind,
    health: &HealthBook,
    supported: impl Fn(AdapterKind) -> bool,
) -> Option<AdapterKind> {
    [preferred, preferred.other()]
        .into_iter()
        .find(|&kind| health.get(kind).is_usable() && supported(kind))
}

// ── Retry ──────────────────────────────────────────────────────────

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then try again with a freshly selected adapter.
    Retry { delay: Duration },
    /// Retries exhausted; drop the item.
    GiveUp,
}

/// Linear back-off: `retry_delay * (retry_count + 1)` while
/// `retry_count < max_retries`.
pub fn next_retry(retry_count: u32, max_retries: u32, retry_delay: Duration) -> RetryDecision {
    if retry_count < max_retries {
        RetryDecision::Retry {
            delay: retry_delay.saturating_mul(retry_count.saturating_add(1)),
        }
    } else {
        RetryDecision::GiveUp
    }
}

// ── Playback phase ─────────────────────────────────────────────────

/// Where the playback worker is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    /// No worker running.
    #[default]
    Idle,
    /// Choosing an adapter for the head item.
    Selecting,
    /// An adapter call is in flight.
    Attempting,
    /// Waiting before the next attempt of the same item.
    BackingOff,
    /// Between items (inter-item delay).
    Draining,
}

impl PlaybackPhase {
    /// Whether an item is being worked on.
    #[must_use]
    pub const fn is_playing(self) -> bool {
        matches!(self, Self::Selecting | Self::Attempting | Self::BackingOff)
    }
}

/// Inputs that move the playback phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The worker took the head of the playback queue.
    Dequeued,
    /// An adapter was selected for the attempt.
    Selected,
    /// Selection found nothing; the item is dropped.
    NoAdapter,
    /// The attempt completed.
    Succeeded,
    /// The attempt failed; `will_retry` says whether another follows.
    Failed { will_retry: bool },
    /// The back-off delay elapsed.
    BackoffElapsed,
    /// The worker found the playback queue empty.
    QueueEmpty,
    /// `stop()` was called.
    Stopped,
}

/// Next phase for `event` in `phase`.
///
/// Events that make no sense in the current phase leave it unchanged.
#[must_use]
pub const fn transition(phase: PlaybackPhase, event: PlaybackEvent) -> PlaybackPhase {
    use PlaybackEvent as E;
    use PlaybackPhase as P;

    match (phase, event) {
        (_, E::Stopped) | (P::Idle | P::Draining, E::QueueEmpty) => P::Idle,
        (P::Idle | P::Draining, E::Dequeued) | (P::BackingOff, E::BackoffElapsed) => P::Selecting,
        (P::Selecting, E::Selected) => P::Attempting,
        (P::Selecting, E::NoAdapter)
        | (P::Attempting, E::Succeeded | E::Failed { will_retry: false }) => P::Draining,
        (P::Attempting, E::Failed { will_retry: true }) => P::BackingOff,
        (current, _) => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_usable_supported_adapter() {
        let book = HealthBook::default();
        assert_eq!(
            select_adapter(AdapterKind::Cloud, &book, |_| true),
            Some(AdapterKind::Cloud)
        );
        assert_eq!(
            select_adapter(AdapterKind::Local, &book, |_| true),
            Some(AdapterKind::Local)
        );
    }

    #[test]
    fn test_falls_back_when_preferred_unavailable() {
        let mut book = HealthBook::default();
        for _ in 0..3 {
            book.cloud.record_failure();
        }
        assert_eq!(
            select_adapter(AdapterKind::Cloud, &book, |_| true),
            Some(AdapterKind::Local)
        );
    }

    #[test]
    fn test_degraded_is_still_selected() {
        let mut book = HealthBook::default();
        book.cloud.record_failure();
        book.cloud.record_failure();
        assert_eq!(
            select_adapter(AdapterKind::Cloud, &book, |_| true),
            Some(AdapterKind::Cloud)
        );
    }

    #[test]
    fn test_falls_back_when_preferred_unsupported() {
        let book = HealthBook::default();
        assert_eq!(
            select_adapter(AdapterKind::Cloud, &book, |k| k == AdapterKind::Local),
            Some(AdapterKind::Local)
        );
    }

    #[test]
    fn test_none_when_nothing_usable() {
        let book = HealthBook::default();
        assert_eq!(select_adapter(AdapterKind::Cloud, &book, |_| false), None);

        let mut dead = HealthBook::default();
        for _ in 0..3 {
            dead.cloud.record_failure();
            dead.local.record_failure();
        }
        assert_eq!(select_adapter(AdapterKind::Local, &dead, |_| true), None);
    }

    #[test]
    fn test_linear_backoff() {
        let base = Duration::from_millis(1000);
        assert_eq!(
            next_retry(0, 3, base),
            RetryDecision::Retry {
                delay: Duration::from_millis(1000)
            }
        );
        assert_eq!(
            next_retry(2, 3, base),
            RetryDecision::Retry {
                delay: Duration::from_millis(3000)
            }
        );
        assert_eq!(next_retry(3, 3, base), RetryDecision::GiveUp);
        assert_eq!(next_retry(0, 0, base), RetryDecision::GiveUp);
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut phase = PlaybackPhase::Idle;
        for event in [
            PlaybackEvent::Dequeued,
            PlaybackEvent::Selected,
            PlaybackEvent::Failed { will_retry: true },
            PlaybackEvent::BackoffElapsed,
            PlaybackEvent::Selected,
            PlaybackEvent::Succeeded,
        ] {
            phase = transition(phase, event);
        }
        assert_eq!(phase, PlaybackPhase::Draining);
        assert_eq!(
            transition(phase, PlaybackEvent::QueueEmpty),
            PlaybackPhase::Idle
        );
        assert_eq!(
            transition(phase, PlaybackEvent::Dequeued),
            PlaybackPhase::Selecting
        );
    }

    #[test]
    fn test_stop_always_idles() {
        for phase in [
            PlaybackPhase::Idle,
            PlaybackPhase::Selecting,
            PlaybackPhase::Attempting,
            PlaybackPhase::BackingOff,
            PlaybackPhase::Draining,
        ] {
            assert_eq!(
                transition(phase, PlaybackEvent::Stopped),
                PlaybackPhase::Idle
            );
        }
    }

    #[test]
    fn test_invalid_events_are_ignored() {
        assert_eq!(
            transition(PlaybackPhase::Idle, PlaybackEvent::Succeeded),
            PlaybackPhase::Idle
        );
        assert_eq!(
            transition(PlaybackPhase::Attempting, PlaybackEvent::Dequeued),
            PlaybackPhase::Attempting
        );
        assert!(PlaybackPhase::BackingOff.is_playing());
        assert!(!PlaybackPhase::Draining.is_playing());
    }

    #[test]
    fn test_no_adapter_drops_to_draining() {
        assert_eq!(
            transition(PlaybackPhase::Selecting, PlaybackEvent::NoAdapter),
            PlaybackPhase::Draining
        );
        assert_eq!(
            transition(
                PlaybackPhase::Attempting,
                PlaybackEvent::Failed { will_retry: false }
            ),
            PlaybackPhase::Draining
        );
    }
}
