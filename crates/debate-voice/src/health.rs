//! Per-adapter health tracking.
//!
//! Health is a pure function of the consecutive error count:
//!
//! | `consecutive_errors` | state |
//! |---|---|
//! | 0 | `Healthy` |
//! | 1-2 | `Degraded` |
//! | 3+ | `Unavailable` |
//!
//! Every attempt updates it. An `Unavailable` adapter is skipped by
//! selection until decay or an explicit reset brings the count down.

use serde::{Deserialize, Serialize};

use crate::adapter::AdapterKind;

/// Errors at which an adapter counts as degraded.
pub const DEGRADED_THRESHOLD: u32 = 1;

/// Errors at which an adapter is no longer selected.
pub const UNAVAILABLE_THRESHOLD: u32 = 3;

/// Health tier of one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    #[default]
    Healthy,
    Degraded,
    Unavailable,
}

impl HealthState {
    #[must_use]
    pub const fn from_errors(consecutive_errors: u32) -> Self {
        if consecutive_errors >= UNAVAILABLE_THRESHOLD {
            Self::Unavailable
        } else if consecutive_errors >= DEGRADED_THRESHOLD {
            Self::Degraded
        } else {
            Self::Healthy
        }
    }
}

/// Health of one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub state: HealthState,
    pub consecutive_errors: u32,
}

impl ServiceHealth {
    pub const fn record_success(&mut self) {
        self.consecutive_errors = 0;
        self.state = HealthState::Healthy;
    }

    pub const fn record_failure(&mut self) {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.state = HealthState::from_errors(self.consecutive_errors);
    }

    /// Forget one error. Returns `true` if the state changed.
    pub fn decay(&mut self) -> bool {
        let before = self.state;
        self.consecutive_errors = self.consecutive_errors.saturating_sub(1);
        self.state = HealthState::from_errors(self.consecutive_errors);
        before != self.state
    }

    #[must_use]
    pub const fn is_usable(&self) -> bool {
        !matches!(self.state, HealthState::Unavailable)
    }
}

/// Health of both adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthBook {
    pub cloud: ServiceHealth,
    pub local: ServiceHealth,
}

impl HealthBook {
    #[must_use]
    pub const fn get(&self, kind: AdapterKind) -> &ServiceHealth {
        match kind {
            AdapterKind::Cloud => &self.cloud,
            AdapterKind::Local => &self.local,
        }
    }

    pub const fn get_mut(&mut self, kind: AdapterKind) -> &mut ServiceHealth {
        match kind {
            AdapterKind::Cloud => &mut self.cloud,
            AdapterKind::Local => &mut self.local,
        }
    }

    /// Decay both adapters by one error.
    pub fn decay_all(&mut self) -> bool {
        let cloud = self.cloud.decay();
        let local = self.local.decay();
        cloud || local
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
