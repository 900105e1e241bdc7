//! Multi-press restart gesture and the OTA session timer.

use heapless::Deque;

use crate::config::{OTA_IDLE_TIMEOUT_MS, RESTART_TOGGLES, RESTART_WINDOW_US};

/// Detects [`RESTART_TOGGLES`] presses within [`RESTART_WINDOW_US`].
#[derive(Clone, Debug, Default)]
pub struct ToggleWindow {
    presses: Deque<u64, RESTART_TOGGLES>,
}

impl ToggleWindow {
    pub const fn new() -> Self {
        Self {
            presses: Deque::new(),
        }
    }

    /// Record a press. Returns `true` when the gesture completes.
    pub fn record(&mut self, now_us: u64) -> bool {
        if self.presses.is_full() {
            self.presses.pop_front();
        }
        // Capacity is RESTART_TOGGLES and one slot was just freed.
        let _ = self.presses.push_back(now_us);

        let complete = self.presses.is_full()
            && self
                .presses
                .front()
                .is_some_and(|&first| now_us.saturating_sub(first) <= RESTART_WINDOW_US);
        if complete {
            self.presses.clear();
        }
        complete
    }
}

/// OTA session bookkeeping. Networking itself is the board's concern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OtaSession {
    last_activity_ms: Option<u64>,
}

impl OtaSession {
    pub const fn new() -> Self {
        Self {
            last_activity_ms: None,
        }
    }

    pub fn start(&mut self, now_ms: u64) {
        info!("OTA: session started");
        self.last_activity_ms = Some(now_ms);
    }

    /// Any sign of life from the update listener.
    pub fn activity(&mut self, now_ms: u64) {
        if self.last_activity_ms.is_some() {
            self.last_activity_ms = Some(now_ms);
        }
    }

    pub fn stop(&mut self) {
        self.last_activity_ms = None;
    }

    pub fn is_active(&self) -> bool {
        self.last_activity_ms.is_some()
    }

    pub fn expired(&self, now_ms: u64) -> bool {
        self.last_activity_ms
            .is_some_and(|t| now_ms.saturating_sub(t) >= OTA_IDLE_TIMEOUT_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_presses_inside_window_complete() {
        let mut w = ToggleWindow::new();
        assert!(!w.record(0));
        assert!(!w.record(1_000_000));
        assert!(w.record(4_000_000));
        // Counter starts over.
        assert!(!w.record(4_500_000));
    }

    #[test]
    fn slow_presses_slide_the_window() {
        let mut w = ToggleWindow::new();
        w.record(0);
        w.record(3_000_000);
        assert!(!w.record(6_000_000));
        assert!(w.record(7_000_000));
    }

    #[test]
    fn ota_times_out_without_activity() {
        let mut s = OtaSession::new();
        assert!(!s.expired(u64::MAX));
        s.start(1_000);
        s.activity(300_000);
        assert!(!s.expired(300_000 + OTA_IDLE_TIMEOUT_MS - 1));
        assert!(s.expired(300_000 + OTA_IDLE_TIMEOUT_MS));
        s.stop();
        assert!(!s.is_active());
    }
}
