//! Queued utterances.

use std::collections::VecDeque;
use std::time::Duration;

use debate_core::Language;
use tokio::time::Instant;

/// One utterance waiting to be played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAudioItem {
    /// Trimmed, never empty.
    pub text: String,
    pub sender: String,
    pub language: Language,
    pub enqueued_at: Instant,
    pub retry_count: u32,
}

impl PendingAudioItem {
    /// Build an item from caller input; `None` if the text is blank.
    pub fn new(text: &str, sender: &str, language: Language) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            sender: sender.to_string(),
            language,
            enqueued_at: Instant::now(),
            retry_count: 0,
        })
    }

    #[must_use]
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.enqueued_at) > ttl
    }
}

/// Bounded FIFO of items held back by the interaction gate.
#[derive(Debug)]
pub struct PendingQueue {
    items: VecDeque<PendingAudioItem>,
    capacity: usize,
}

impl PendingQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `item`, handing it back if the queue is full.
    pub fn push(&mut self, item: PendingAudioItem) -> Result<(), PendingAudioItem> {
        if self.items.len() >= self.capacity {
            return Err(item);
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Remove everything, returning items younger than `ttl` in arrival
    /// order and the number of expired ones.
    pub fn take_fresh(&mut self, now: Instant, ttl: Duration) -> (Vec<PendingAudioItem>, usize) {
        let all: Vec<_> = self.items.drain(..).collect();
        let total = all.len();
        let fresh: Vec<_> = all
            .into_iter()
            .filter(|item| !item.is_expired(now, ttl))
            .collect();
        let expired = total - fresh.len();
        (fresh, expired)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
