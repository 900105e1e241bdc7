//! Set-mode editor.
//!
//! Owns the edit buffer while one target (time, alarm, date or model) is
//! being changed with the switches. Increments happen on every
//! top-of-second and half-second edge while `Hold` is released. The
//! controller decides when to enter; the editor decides when to leave and
//! hands back a [`Commit`] describing what to write.

use crate::emulation::{Model, MODEL_COUNT};
use crate::switches::{MuxReader, SwitchId};
use crate::time::DateTime;
use crate::timing::Pulses;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EditTarget {
    Time,
    Alarm,
    Date,
    Model,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EditorState {
    Idle,
    Editing(EditTarget),
}

/// Fields under edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EditBuffer {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub month: u8,
    pub day: u8,
    pub model: u8,
}

impl Default for EditBuffer {
    fn default() -> Self {
        Self {
            hour: 0,
            minute: 0,
            second: 0,
            month: 1,
            day: 1,
            model: 0,
        }
    }
}

/// Effect of leaving the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Commit {
    Time { hour: u8, minute: u8, second: u8 },
    Alarm { hour: u8, minute: u8 },
    /// `changed` is false when the user left the date as it was.
    Date { month: u8, day: u8, changed: bool },
    Model(Model),
}

pub struct Editor {
    state: EditorState,
    buf: EditBuffer,
    /// Forced TIME entry (RTC invalid at boot): leave on TimeSet release.
    forced: bool,
    date_seed: (u8, u8),
    /// The canonical time has been set (commit, trusted RTC or fresh sync).
    time_known: bool,
}

impl Editor {
    /// `time_known`: whether the canonical time has ever been set.
    pub fn new(time_known: bool) -> Self {
        Self {
            state: EditorState::Idle,
            buf: EditBuffer::default(),
            forced: false,
            date_seed: (1, 1),
            time_known,
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn target(&self) -> Option<EditTarget> {
        match self.state {
            EditorState::Idle => None,
            EditorState::Editing(t) => Some(t),
        }
    }

    pub fn is_editing(&self) -> bool {
        self.state != EditorState::Idle
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buf
    }

    pub fn time_known(&self) -> bool {
        self.time_known
    }

    /// The time source now holds a real time (e.g. after a network sync).
    pub fn mark_time_known(&mut self) {
        if !self.time_known {
            debug!("Editor: canonical time known");
            self.time_known = true;
        }
    }

    /// Enter TIME. Seeds from zeros while the canonical time is unknown,
    /// else from `now`. Seconds reset unless `keep_seconds` (hold engaged).
    pub fn enter_time(&mut self, now: &DateTime, keep_seconds: bool, forced: bool) {
        if !self.time_known {
            self.buf.hour = 0;
            self.buf.minute = 0;
            self.buf.second = 0;
        } else {
            self.buf.hour = now.hour;
            self.buf.minute = now.minute;
            self.buf.second = if keep_seconds { now.second } else { 0 };
        }
        self.forced = forced;
        self.begin(EditTarget::Time);
    }

    /// Enter ALARM, seeded from the stored alarm or zeros.
    pub fn enter_alarm(&mut self, stored: Option<(u8, u8)>) {
        let (hour, minute) = stored.unwrap_or((0, 0));
        self.buf.hour = hour;
        self.buf.minute = minute;
        self.buf.second = 0;
        self.forced = false;
        self.begin(EditTarget::Alarm);
    }

    /// Enter DATE, seeded from the current date or 1/1.
    pub fn enter_date(&mut self, today: Option<&DateTime>) {
        let (month, day) = today.map_or((1, 1), |d| (d.month, d.day));
        self.buf.month = month;
        self.buf.day = day;
        self.date_seed = (month, day);
        self.forced = false;
        self.begin(EditTarget::Date);
    }

    /// Enter MODEL, starting from the first model.
    pub fn enter_model(&mut self) {
        self.buf.model = 0;
        self.forced = false;
        self.begin(EditTarget::Model);
    }

    fn begin(&mut self, target: EditTarget) {
        info!("Editor: Idle -> {:?}", target);
        self.state = EditorState::Editing(target);
    }

    /// One processing cycle while editing.
    pub fn update(&mut self, sw: &MuxReader, pulses: Pulses) -> Option<Commit> {
        let target = self.target()?;

        if self.should_exit(target, sw) {
            let commit = self.commit(target);
            info!("Editor: {:?} -> Idle ({:?})", target, commit);
            if matches!(commit, Commit::Time { .. } | Commit::Date { changed: true, .. }) {
                self.time_known = true;
            }
            self.state = EditorState::Idle;
            self.forced = false;
            return Some(commit);
        }

        if pulses.any() && !sw.is_pressed(SwitchId::Hold) {
            self.increment(
                target,
                sw.is_pressed(SwitchId::HourMonth),
                sw.is_pressed(SwitchId::MinDay),
            );
        }
        None
    }

    fn should_exit(&self, target: EditTarget, sw: &MuxReader) -> bool {
        match target {
            EditTarget::Time if self.forced => sw.released_edge(SwitchId::TimeSet),
            EditTarget::Time => {
                !sw.is_pressed(SwitchId::TimeSet) && !sw.is_pressed(SwitchId::Hold)
            }
            EditTarget::Alarm | EditTarget::Date => !sw.is_pressed(SwitchId::AlarmDate),
            EditTarget::Model => sw.pressed_edge(SwitchId::TimeSet),
        }
    }

    fn commit(&self, target: EditTarget) -> Commit {
        let b = &self.buf;
        match target {
            EditTarget::Time => Commit::Time {
                hour: b.hour,
                minute: b.minute,
                second: b.second,
            },
            EditTarget::Alarm => Commit::Alarm {
                hour: b.hour,
                minute: b.minute,
            },
            EditTarget::Date => Commit::Date {
                month: b.month,
                day: b.day,
                changed: (b.month, b.day) != self.date_seed,
            },
            EditTarget::Model => Commit::Model(Model::from_index(b.model)),
        }
    }

    fn increment(&mut self, target: EditTarget, hour_sw: bool, min_sw: bool) {
        let b = &mut self.buf;
        match target {
            EditTarget::Time | EditTarget::Alarm => match (hour_sw, min_sw) {
                (true, true) => b.minute = step_minute_tens(b.minute),
                (true, false) => b.hour = (b.hour + 1) % 24,
                (false, true) => b.minute = step_minute_ones(b.minute),
                (false, false) => {}
            },
            EditTarget::Date => {
                if min_sw {
                    b.day += 1;
                    if b.day >= 32 {
                        b.day = 1;
                        b.month += 1;
                    }
                }
                if hour_sw {
                    b.month += 1;
                }
                if b.month >= 13 {
                    b.month = 1;
                }
            }
            EditTarget::Model => {
                if hour_sw {
                    b.model = (b.model + 1) % MODEL_COUNT;
                }
            }
        }
    }
}

/// Minute tens +1, wrapping at 60, ones digit kept.
pub fn step_minute_tens(minute: u8) -> u8 {
    ((minute / 10 + 1) % 6) * 10 + minute % 10
}

/// Minute ones +1 without carrying into the tens (59 → 50).
pub fn step_minute_ones(minute: u8) -> u8 {
    (minute / 10) * 10 + (minute % 10 + 1) % 10
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEBOUNCE_US;

    const TOP: Pulses = Pulses {
        top_of_second: true,
        half_second: false,
    };

    /// Debounced switch state built by sampling every phase twice.
    fn switches(held: &[SwitchId]) -> MuxReader {
        let mut r = MuxReader::new();
        settle(&mut r, held, 0);
        r
    }

    fn settle(r: &mut MuxReader, held: &[SwitchId], t0: u64) {
        for t in [t0, t0 + DEBOUNCE_US] {
            r.begin_cycle();
            for phase in 0..6 {
                let map = crate::switches::SCAN_TABLE[phase];
                let a = map.line_a.is_some_and(|id| held.contains(&id));
                let b = map.line_b.is_some_and(|id| held.contains(&id));
                r.sample_phase(phase, a, b, t);
            }
            r.sample_direct(SwitchId::Hold, held.contains(&SwitchId::Hold), t);
        }
    }

    fn at(hour: u8, minute: u8, second: u8) -> DateTime {
        DateTime::default().with_time(hour, minute, second)
    }

    #[test]
    fn minute_digit_steps() {
        assert_eq!(step_minute_ones(59), 50);
        assert_eq!(step_minute_ones(41), 42);
        assert_eq!(step_minute_tens(59), 9);
        assert_eq!(step_minute_tens(27), 37);
    }

    #[test]
    fn unknown_time_seeds_zeros_until_committed() {
        let mut e = Editor::new(false);
        e.enter_time(&at(13, 45, 30), false, false);
        assert_eq!((e.buffer().hour, e.buffer().minute), (0, 0));
        assert!(!e.time_known());

        e.update(&switches(&[]), Pulses::default());
        assert!(e.time_known());
        e.enter_time(&at(13, 45, 30), false, false);
        assert_eq!((e.buffer().hour, e.buffer().minute), (13, 45));
    }

    #[test]
    fn alarm_entry_leaves_time_unknown() {
        let mut e = Editor::new(false);
        e.enter_alarm(Some((6, 30)));
        let r = switches(&[]);
        assert!(matches!(e.update(&r, Pulses::default()), Some(Commit::Alarm { .. })));
        assert!(!e.time_known());

        e.enter_time(&at(9, 10, 0), false, false);
        assert_eq!(e.buffer().hour, 0);
    }

    #[test]
    fn marking_time_known_seeds_from_now() {
        let mut e = Editor::new(false);
        e.mark_time_known();
        e.enter_time(&at(10, 30, 5), false, false);
        assert_eq!((e.buffer().hour, e.buffer().minute, e.buffer().second), (10, 30, 0));
    }

    #[test]
    fn time_seed_resets_seconds_unless_held() {
        let mut e = Editor::new(true);
        e.enter_time(&at(13, 45, 30), false, false);
        assert_eq!((e.buffer().hour, e.buffer().minute, e.buffer().second), (13, 45, 0));
        e.enter_time(&at(13, 45, 30), true, false);
        assert_eq!(e.buffer().second, 30);
    }

    #[test]
    fn time_increments_follow_held_switches() {
        let mut e = Editor::new(true);
        e.enter_time(&at(23, 59, 0), false, false);

        let hour = switches(&[SwitchId::TimeSet, SwitchId::HourMonth]);
        assert_eq!(e.update(&hour, TOP), None);
        assert_eq!(e.buffer().hour, 0);

        let min = switches(&[SwitchId::TimeSet, SwitchId::MinDay]);
        e.update(&min, TOP);
        assert_eq!(e.buffer().minute, 50);

        let both = switches(&[SwitchId::TimeSet, SwitchId::HourMonth, SwitchId::MinDay]);
        e.update(&both, TOP);
        assert_eq!(e.buffer().minute, 0);
        assert_eq!(e.buffer().hour, 0);

        // No pulse, no change.
        e.update(&min, Pulses::default());
        assert_eq!(e.buffer().minute, 0);
    }

    #[test]
    fn hold_blocks_increments() {
        let mut e = Editor::new(true);
        e.enter_time(&at(8, 0, 12), true, false);
        let held = switches(&[SwitchId::Hold, SwitchId::HourMonth]);
        e.update(&held, TOP);
        assert_eq!(e.buffer().hour, 8);
        assert!(e.is_editing());
    }

    #[test]
    fn time_exits_when_set_and_hold_released() {
        let mut e = Editor::new(true);
        e.enter_time(&at(6, 30, 0), false, false);
        let commit = e.update(&switches(&[]), Pulses::default());
        assert_eq!(
            commit,
            Some(Commit::Time {
                hour: 6,
                minute: 30,
                second: 0
            })
        );
        assert_eq!(e.state(), EditorState::Idle);
    }

    #[test]
    fn forced_time_waits_for_timeset_release() {
        let mut e = Editor::new(false);
        e.enter_time(&at(0, 0, 0), false, true);
        assert_eq!(e.update(&switches(&[]), TOP), None);

        let mut r = switches(&[SwitchId::TimeSet]);
        assert_eq!(e.update(&r, TOP), None);
        settle(&mut r, &[], 10_000);
        assert!(matches!(e.update(&r, Pulses::default()), Some(Commit::Time { .. })));
    }

    #[test]
    fn alarm_exits_on_alarm_date_release() {
        let mut e = Editor::new(true);
        e.enter_alarm(Some((7, 15)));
        let r = switches(&[SwitchId::AlarmDate, SwitchId::MinDay]);
        e.update(&r, TOP);
        assert_eq!(e.update(&r, TOP), None);
        assert_eq!(
            e.update(&switches(&[]), Pulses::default()),
            Some(Commit::Alarm { hour: 7, minute: 17 })
        );
    }

    #[test]
    fn date_rolls_day_into_month() {
        let mut e = Editor::new(true);
        let today = DateTime::default().with_date(12, 31);
        e.enter_date(Some(&today));
        let r = switches(&[SwitchId::AlarmDate, SwitchId::MinDay]);
        e.update(&r, TOP);
        assert_eq!((e.buffer().month, e.buffer().day), (1, 1));

        let r = switches(&[SwitchId::AlarmDate, SwitchId::HourMonth]);
        e.update(&r, TOP);
        assert_eq!(e.buffer().month, 2);

        assert_eq!(
            e.update(&switches(&[]), TOP),
            Some(Commit::Date {
                month: 2,
                day: 1,
                changed: true
            })
        );
    }

    #[test]
    fn untouched_date_is_not_changed() {
        let mut e = Editor::new(true);
        e.enter_date(None);
        assert_eq!(
            e.update(&switches(&[]), TOP),
            Some(Commit::Date {
                month: 1,
                day: 1,
                changed: false
            })
        );
    }

    #[test]
    fn model_index_wraps_and_commits_on_timeset_press() {
        let mut e = Editor::new(false);
        e.enter_model();
        let hour = switches(&[SwitchId::HourMonth]);
        let mut seen = std::vec::Vec::new();
        for _ in 0..5 {
            e.update(&hour, TOP);
            seen.push(e.buffer().model);
        }
        assert_eq!(seen, [1, 2, 3, 0, 1]);

        // Releasing everything does not leave MODEL.
        assert_eq!(e.update(&switches(&[]), TOP), None);

        let set = switches(&[SwitchId::TimeSet]);
        assert_eq!(e.update(&set, Pulses::default()), Some(Commit::Model(Model::B)));
    }
}
