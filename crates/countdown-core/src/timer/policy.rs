//! Per-tick notification decisions.

use serde::{Deserialize, Serialize};

use crate::storage::TimerConfiguration;

/// What a single tick should trigger, besides the display update which
/// always happens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickDecision {
    pub complete: bool,
    pub announce_voice: bool,
    pub beep: bool,
}

/// Decides notifications from the remaining time and the configured cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationPolicy {
    voice_interval: u64,
    beep_interval: u64,
    final_window: u64,
}

impl NotificationPolicy {
    /// Intervals of zero are clamped to one so the modulus checks stay defined.
    pub fn new(voice_interval: u64, beep_interval: u64, final_window: u64) -> Self {
        Self {
            voice_interval: voice_interval.max(1),
            beep_interval: beep_interval.max(1),
            final_window,
        }
    }

    pub fn from_config(config: &TimerConfiguration) -> Self {
        Self::new(
            config.voice_interval_seconds,
            config.beep_interval_seconds,
            config.final_window_seconds,
        )
    }

    pub fn should_announce_voice(&self, remaining: u64) -> bool {
        remaining % self.voice_interval == 0
    }

    pub fn should_beep(&self, remaining: u64) -> bool {
        remaining < self.final_window && remaining % self.beep_interval == 0
    }

    pub fn is_complete(&self, remaining: u64) -> bool {
        remaining == 0
    }

    /// Completion short-circuits: at zero neither voice nor beep is evaluated.
    pub fn decide(&self, remaining: u64) -> TickDecision {
        if self.is_complete(remaining) {
            return TickDecision {
                complete: true,
                ..TickDecision::default()
            };
        }
        TickDecision {
            complete: false,
            announce_voice: self.should_announce_voice(remaining),
            beep: self.should_beep(remaining),
        }
    }
}
