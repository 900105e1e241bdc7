//! Switch multiplex reader and mains-presence detector.

use super::{Debouncer, PhaseSwitches, SwitchId, SwitchSet, SCAN_TABLE};
use crate::config::{MAINS_TIMEOUT_US, SWITCH_COUNT};

/// Turns sense-line samples taken during a scan phase into debounced
/// logical switch states.
pub struct MuxReader {
    switches: [Debouncer; SWITCH_COUNT],
    table: &'static [PhaseSwitches],
}

impl MuxReader {
    pub const fn new() -> Self {
        Self::with_table(&SCAN_TABLE)
    }

    /// Reader over a custom phase table (alternate board wiring).
    pub const fn with_table(table: &'static [PhaseSwitches]) -> Self {
        Self {
            switches: [Debouncer::new(); SWITCH_COUNT],
            table,
        }
    }

    /// Start a processing cycle: every `changed` flag from the previous one is dropped.
    pub fn begin_cycle(&mut self) {
        for sw in self.switches.iter_mut() {
            sw.clear_changed();
        }
    }

    /// Sample both sense lines for the switches wired to `phase`.
    pub fn sample_phase(&mut self, phase: usize, line_a: bool, line_b: bool, now_us: u64) {
        let Some(map) = self.table.get(phase).copied() else {
            return;
        };
        if let Some(id) = map.line_a {
            self.switches[id.index()].update(line_a, now_us);
        }
        if let Some(id) = map.line_b {
            self.switches[id.index()].update(line_b, now_us);
        }
    }

    /// Sample a switch that has its own line.
    pub fn sample_direct(&mut self, id: SwitchId, level: bool, now_us: u64) {
        self.switches[id.index()].update(level, now_us);
    }

    pub fn is_pressed(&self, id: SwitchId) -> bool {
        self.switches[id.index()].stable()
    }

    pub fn changed(&self, id: SwitchId) -> bool {
        self.switches[id.index()].changed()
    }

    pub fn pressed_edge(&self, id: SwitchId) -> bool {
        let sw = &self.switches[id.index()];
        sw.changed() && sw.stable()
    }

    pub fn released_edge(&self, id: SwitchId) -> bool {
        let sw = &self.switches[id.index()];
        sw.changed() && !sw.stable()
    }

    /// All switches currently held.
    pub fn held(&self) -> SwitchSet {
        let mut set = SwitchSet::EMPTY;
        for id in SwitchId::ALL {
            if self.is_pressed(id) {
                set.insert(id);
            }
        }
        set
    }

    /// Any switch accepted a transition this cycle.
    pub fn any_changed(&self) -> bool {
        self.switches.iter().any(|s| s.changed())
    }

    /// Time of the most recent accepted transition across all switches.
    pub fn last_change_us(&self) -> u64 {
        self.switches
            .iter()
            .map(|s| s.stable_change_us())
            .max()
            .unwrap_or(0)
    }
}

impl Default for MuxReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Line-frequency presence detector.
///
/// Presence drops once no transition has been seen for [`MAINS_TIMEOUT_US`].
/// When disabled the mains is always reported present.
#[derive(Clone, Copy, Debug)]
pub struct MainsDetector {
    enabled: bool,
    last_level: Option<bool>,
    last_transition_us: Option<u64>,
}

impl MainsDetector {
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last_level: None,
            last_transition_us: None,
        }
    }

    pub fn sample(&mut self, level: bool, now_us: u64) {
        if self.last_level.is_some_and(|l| l != level) {
            self.last_transition_us = Some(now_us);
        }
        self.last_level = Some(level);
    }

    pub fn is_present(&self, now_us: u64) -> bool {
        if !self.enabled {
            return true;
        }
        self.last_transition_us
            .is_some_and(|t| now_us.saturating_sub(t) < MAINS_TIMEOUT_US)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEBOUNCE_US;

    fn press_through_phase(r: &mut MuxReader, phase: usize, a: bool, b: bool, t0: u64) -> u64 {
        r.begin_cycle();
        r.sample_phase(phase, a, b, t0);
        r.begin_cycle();
        r.sample_phase(phase, a, b, t0 + DEBOUNCE_US);
        t0 + DEBOUNCE_US
    }

    #[test]
    fn phase_two_maps_to_hour_and_minute() {
        let mut r = MuxReader::new();
        press_through_phase(&mut r, 2, true, false, 0);
        assert!(r.is_pressed(SwitchId::HourMonth));
        assert!(r.pressed_edge(SwitchId::HourMonth));
        assert!(!r.is_pressed(SwitchId::MinDay));
        assert!(!r.is_pressed(SwitchId::TimeSet));
    }

    #[test]
    fn idle_phases_touch_nothing() {
        let mut r = MuxReader::new();
        press_through_phase(&mut r, 0, true, true, 0);
        press_through_phase(&mut r, 5, true, true, 5_000);
        press_through_phase(&mut r, 9, true, true, 10_000);
        assert!(r.held().is_empty());
    }

    #[test]
    fn edge_lasts_one_cycle() {
        let mut r = MuxReader::new();
        let t = press_through_phase(&mut r, 1, true, false, 0);
        assert!(r.pressed_edge(SwitchId::TimeSet));
        assert!(r.any_changed());
        r.begin_cycle();
        r.sample_phase(1, true, false, t + 500);
        assert!(!r.pressed_edge(SwitchId::TimeSet));
        assert!(r.is_pressed(SwitchId::TimeSet));

        let t = press_through_phase(&mut r, 1, false, false, t + 1_000);
        assert!(r.released_edge(SwitchId::TimeSet));
        assert_eq!(r.last_change_us(), t);
    }

    #[test]
    fn hold_is_sampled_directly() {
        let mut r = MuxReader::new();
        r.sample_direct(SwitchId::Hold, true, 0);
        r.sample_direct(SwitchId::Hold, true, DEBOUNCE_US);
        assert!(r.held().contains(SwitchId::Hold));
    }

    #[test]
    fn mains_presence_times_out() {
        let mut m = MainsDetector::new(true);
        assert!(!m.is_present(0));
        m.sample(false, 0);
        m.sample(true, 10_000);
        assert!(m.is_present(50_000));
        assert!(!m.is_present(10_000 + MAINS_TIMEOUT_US));
        m.sample(false, 120_000);
        assert!(m.is_present(130_000));
    }

    #[test]
    fn disabled_detector_reports_present() {
        let m = MainsDetector::new(false);
        assert!(m.is_present(1_000_000));
        assert!(!m.is_enabled());
    }
}
