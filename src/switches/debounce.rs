//! Per-switch debounce filter.

use crate::config::DEBOUNCE_US;

/// Debounced view of one switch.
///
/// A raw level must stay unchanged for [`DEBOUNCE_US`] before it is accepted;
/// any flicker restarts the quiet timer. Only the latest stable level is kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Debouncer {
    stable: bool,
    changed: bool,
    last_raw: bool,
    last_raw_change_us: u64,
    stable_change_us: u64,
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            stable: false,
            changed: false,
            last_raw: false,
            last_raw_change_us: 0,
            stable_change_us: 0,
        }
    }

    /// Feed one raw sample. Returns `true` when a new stable level is accepted.
    pub fn update(&mut self, raw: bool, now_us: u64) -> bool {
        if raw != self.last_raw {
            self.last_raw = raw;
            self.last_raw_change_us = now_us;
            return false;
        }

        if raw == self.stable {
            return false;
        }

        if now_us.saturating_sub(self.last_raw_change_us) < DEBOUNCE_US {
            return false;
        }

        self.stable = raw;
        self.stable_change_us = now_us;
        self.changed = true;
        true
    }

    /// End of a processing cycle.
    pub fn clear_changed(&mut self) {
        self.changed = false;
    }

    pub fn stable(&self) -> bool {
        self.stable
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn stable_change_us(&self) -> u64 {
        self.stable_change_us
    }
}
