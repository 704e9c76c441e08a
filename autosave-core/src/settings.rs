//! The user-preference record persisted across runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const MIN_SAVE_INTERVAL_MIN: u32 = 1;
pub const MAX_SAVE_INTERVAL_MIN: u32 = 120;
pub const MIN_SAVES_TO_KEEP: u32 = 1;
pub const MAX_SAVES_TO_KEEP: u32 = 30;

/// All five user preferences. `#[serde(default)]` keeps old settings files
/// loadable when a field is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub save_interval_minutes: u32,
    pub max_saves_to_keep:     u32,
    pub save_while_paused:     bool,
    pub save_while_on_ground:  bool,
    pub autosave_on_start:     bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            save_interval_minutes: 10,
            max_saves_to_keep:     10,
            save_while_paused:     false,
            save_while_on_ground:  true,
            autosave_on_start:     true,
        }
    }
}

impl Settings {
    /// Force the numeric fields into their documented ranges. Applied after
    /// every load so a hand-edited file cannot produce a zero-length timer.
    pub fn clamped(mut self) -> Self {
        self.save_interval_minutes = self
            .save_interval_minutes
            .clamp(MIN_SAVE_INTERVAL_MIN, MAX_SAVE_INTERVAL_MIN);
        self.max_saves_to_keep = self
            .max_saves_to_keep
            .clamp(MIN_SAVES_TO_KEEP, MAX_SAVES_TO_KEEP);
        self
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.save_interval_minutes) * 60)
    }
}
