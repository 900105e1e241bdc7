//! Display mode sequencer.
//!
//! Decides once per second (and after touch or switch events) what the
//! display shows. Precedence, highest first:
//!
//! 1. transient message
//! 2. set-mode editor
//! 3. DATE countdown
//! 4. mains absent in hardware-faithful mode (blank)
//! 5. manual override (network mode)
//! 6. blank day (network mode)
//! 7. outside the daily window (network mode)
//! 8. auto-date seconds (hardware-faithful, auto-date model)
//! 9. TIME

use super::segments::Message;
use super::DisplayMode;
use crate::config::ClockConfig;
use crate::emulation::Emulation;
use crate::time::DateTime;

/// Touch-forced display state, kept until the schedule agrees with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Override {
    Shown,
    Blanked,
}

/// Per-evaluation context from the controller.
#[derive(Clone, Copy, Debug)]
pub struct SequencerInputs<'a> {
    pub emulation: Emulation,
    pub now: &'a DateTime,
    pub editing: bool,
    pub mains_present: bool,
    /// Model can auto-date and the user has it enabled.
    pub auto_date: bool,
    pub config: &'a ClockConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Transient {
    message: Message,
    /// Remaining seconds; `None` stays until cleared.
    remaining: Option<u8>,
}

pub struct Sequencer {
    date_countdown: u8,
    manual: Option<Override>,
    transient: Option<Transient>,
    mode: DisplayMode,
}

/// Is `minute` inside the daily window `[on, off)`?
///
/// Wraps past midnight when `on > off`; `on == off` means always on.
pub fn in_window(on: u16, off: u16, minute: u16) -> bool {
    if on == off {
        true
    } else if on < off {
        minute >= on && minute < off
    } else {
        minute >= on || minute < off
    }
}

/// Is `weekday` (0 = Sunday) flagged in the blank-day mask?
pub fn is_blank_day(mask: u8, weekday: u8) -> bool {
    weekday < 7 && mask & (1 << weekday) != 0
}

/// Natural schedule state in network mode: should the display be lit?
pub fn scheduled_on(config: &ClockConfig, now: &DateTime) -> bool {
    !is_blank_day(config.blank_days, now.weekday)
        && in_window(
            config.display_on_minute,
            config.display_off_minute,
            now.minute_of_day(),
        )
}

impl Sequencer {
    pub const fn new() -> Self {
        Self {
            date_countdown: 0,
            manual: None,
            transient: None,
            mode: DisplayMode::Time,
        }
    }

    pub fn evaluate(&mut self, inp: &SequencerInputs<'_>) -> DisplayMode {
        self.mode = self.decide(inp);
        self.mode
    }

    fn decide(&mut self, inp: &SequencerInputs<'_>) -> DisplayMode {
        if let Some(t) = self.transient {
            return DisplayMode::Message(t.message);
        }
        if inp.editing {
            return DisplayMode::Set;
        }
        if self.date_countdown > 0 {
            return DisplayMode::Date;
        }
        if inp.emulation == Emulation::HardwareFaithful && !inp.mains_present {
            return DisplayMode::Message(Message::Blank);
        }

        match inp.emulation {
            Emulation::Network => {
                let natural = scheduled_on(inp.config, inp.now);
                if let Some(target) = self.manual {
                    if (target == Override::Shown) == natural {
                        debug!("Sequencer: override {:?} caught up", target);
                        self.manual = None;
                    } else {
                        return match target {
                            Override::Shown => DisplayMode::Time,
                            Override::Blanked => DisplayMode::Message(Message::Blank),
                        };
                    }
                }
                if natural {
                    DisplayMode::Time
                } else {
                    DisplayMode::Message(Message::Blank)
                }
            }
            Emulation::HardwareFaithful => {
                if inp.auto_date && matches!(inp.now.second % 10, 8 | 9) {
                    DisplayMode::Date
                } else {
                    DisplayMode::Time
                }
            }
        }
    }

    /// Once per top-of-second edge.
    pub fn tick_second(&mut self) {
        self.date_countdown = self.date_countdown.saturating_sub(1);
        if let Some(t) = self.transient.as_mut() {
            if let Some(left) = t.remaining.as_mut() {
                *left = left.saturating_sub(1);
                if *left == 0 {
                    self.transient = None;
                }
            }
        }
    }

    pub fn show_date(&mut self, secs: u8) {
        self.date_countdown = secs;
    }

    /// Show `message` for `secs` seconds, or until [`Self::clear_message`] when `None`.
    pub fn show_message(&mut self, message: Message, secs: Option<u8>) {
        self.transient = Some(Transient {
            message,
            remaining: secs,
        });
    }

    pub fn clear_message(&mut self) {
        self.transient = None;
    }

    /// Back to the plain clock (after an editor commit).
    pub fn reset_to_time(&mut self) {
        self.date_countdown = 0;
        self.mode = DisplayMode::Time;
    }

    /// Fused touch rising edge: TIME → DATE → blank → TIME.
    ///
    /// Hardware-faithful mode only does TIME → DATE.
    pub fn touch(&mut self, emulation: Emulation, date_secs: u8) {
        match (self.mode, emulation) {
            (DisplayMode::Time, _) => self.show_date(date_secs),
            (DisplayMode::Date, Emulation::Network) => {
                self.date_countdown = 0;
                self.manual = Some(Override::Blanked);
            }
            (DisplayMode::Message(Message::Blank), Emulation::Network) => {
                self.manual = Some(Override::Shown);
            }
            _ => {}
        }
        debug!("Sequencer: touch in {:?}", self.mode);
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn date_countdown(&self) -> u8 {
        self.date_countdown
    }

    pub fn manual_override(&self) -> Option<Override> {
        self.manual
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u8, minute: u8, second: u8, weekday: u8) -> DateTime {
        DateTime {
            hour,
            minute,
            second,
            weekday,
            ..DateTime::default()
        }
    }

    fn night_blank() -> ClockConfig {
        // Lit 07:00-22:00, blank on Sundays.
        ClockConfig {
            display_on_minute: 7 * 60,
            display_off_minute: 22 * 60,
            blank_days: 0b0000_0001,
            ..ClockConfig::default()
        }
    }

    fn inputs<'a>(emulation: Emulation, now: &'a DateTime, config: &'a ClockConfig) -> SequencerInputs<'a> {
        SequencerInputs {
            emulation,
            now,
            editing: false,
            mains_present: true,
            auto_date: false,
            config,
        }
    }

    const BLANK: DisplayMode = DisplayMode::Message(Message::Blank);

    #[test]
    fn window_wraps_past_midnight() {
        assert!(in_window(22 * 60, 6 * 60, 23 * 60));
        assert!(in_window(22 * 60, 6 * 60, 60));
        assert!(!in_window(22 * 60, 6 * 60, 12 * 60));
        assert!(in_window(7 * 60, 22 * 60, 7 * 60));
        assert!(!in_window(7 * 60, 22 * 60, 22 * 60));
        assert!(in_window(300, 300, 0));
    }

    #[test]
    fn blank_day_mask() {
        assert!(is_blank_day(0b1000_0001, 0));
        assert!(!is_blank_day(0b1000_0001, 6));
        assert!(!is_blank_day(0xFF, 7));
    }

    #[test]
    fn date_countdown_beats_blank_window() {
        let cfg = night_blank();
        let now = at(23, 30, 0, 3);
        let mut s = Sequencer::new();
        assert_eq!(s.evaluate(&inputs(Emulation::Network, &now, &cfg)), BLANK);

        s.show_date(3);
        s.manual = Some(Override::Blanked);
        assert_eq!(s.evaluate(&inputs(Emulation::Network, &now, &cfg)), DisplayMode::Date);
        for _ in 0..3 {
            s.tick_second();
        }
        assert_eq!(s.evaluate(&inputs(Emulation::Network, &now, &cfg)), BLANK);
    }

    #[test]
    fn blank_day_blanks_in_network_mode_only() {
        let cfg = night_blank();
        let sunday_noon = at(12, 0, 0, 0);
        let mut s = Sequencer::new();
        assert_eq!(s.evaluate(&inputs(Emulation::Network, &sunday_noon, &cfg)), BLANK);
        assert_eq!(
            s.evaluate(&inputs(Emulation::HardwareFaithful, &sunday_noon, &cfg)),
            DisplayMode::Time
        );
    }

    #[test]
    fn override_holds_until_schedule_catches_up() {
        let cfg = night_blank();
        let mut s = Sequencer::new();
        let late = at(23, 0, 0, 2);
        assert_eq!(s.evaluate(&inputs(Emulation::Network, &late, &cfg)), BLANK);

        // Blank → TIME by touch.
        s.touch(Emulation::Network, 3);
        assert_eq!(s.manual_override(), Some(Override::Shown));
        assert_eq!(s.evaluate(&inputs(Emulation::Network, &late, &cfg)), DisplayMode::Time);

        // Next morning the window opens and the override dissolves.
        let morning = at(7, 0, 0, 3);
        assert_eq!(s.evaluate(&inputs(Emulation::Network, &morning, &cfg)), DisplayMode::Time);
        assert_eq!(s.manual_override(), None);
    }

    #[test]
    fn touch_cycles_time_date_blank_time() {
        let cfg = ClockConfig::default();
        let now = at(10, 0, 0, 1);
        let mut s = Sequencer::new();
        let net = inputs(Emulation::Network, &now, &cfg);
        assert_eq!(s.evaluate(&net), DisplayMode::Time);

        s.touch(Emulation::Network, 3);
        assert_eq!(s.evaluate(&net), DisplayMode::Date);
        s.touch(Emulation::Network, 3);
        assert_eq!(s.evaluate(&net), BLANK);
        s.touch(Emulation::Network, 3);
        assert_eq!(s.evaluate(&net), DisplayMode::Time);
    }

    #[test]
    fn hardware_touch_only_shows_date() {
        let cfg = ClockConfig::default();
        let now = at(10, 0, 0, 1);
        let mut s = Sequencer::new();
        let hw = inputs(Emulation::HardwareFaithful, &now, &cfg);
        s.evaluate(&hw);
        s.touch(Emulation::HardwareFaithful, 3);
        assert_eq!(s.evaluate(&hw), DisplayMode::Date);
        s.touch(Emulation::HardwareFaithful, 3);
        assert_eq!(s.evaluate(&hw), DisplayMode::Date);
        assert_eq!(s.manual_override(), None);
    }

    #[test]
    fn auto_date_on_eight_and_nine() {
        let cfg = ClockConfig::default();
        let mut s = Sequencer::new();
        for sec in 0..60u8 {
            let now = at(9, 15, sec, 4);
            let inp = SequencerInputs {
                auto_date: true,
                ..inputs(Emulation::HardwareFaithful, &now, &cfg)
            };
            let expected = if sec % 10 >= 8 {
                DisplayMode::Date
            } else {
                DisplayMode::Time
            };
            assert_eq!(s.evaluate(&inp), expected, "second {}", sec);
        }
    }

    #[test]
    fn mains_loss_blanks_hardware_mode() {
        let cfg = ClockConfig::default();
        let now = at(9, 0, 0, 1);
        let mut s = Sequencer::new();
        let inp = SequencerInputs {
            mains_present: false,
            ..inputs(Emulation::HardwareFaithful, &now, &cfg)
        };
        assert_eq!(s.evaluate(&inp), BLANK);
        let net = SequencerInputs {
            mains_present: false,
            ..inputs(Emulation::Network, &now, &cfg)
        };
        assert_eq!(s.evaluate(&net), DisplayMode::Time);
    }

    #[test]
    fn date_countdown_outranks_mains_blank() {
        let cfg = ClockConfig::default();
        let now = at(9, 0, 0, 1);
        let mut s = Sequencer::new();
        s.show_date(3);
        let inp = SequencerInputs {
            mains_present: false,
            ..inputs(Emulation::HardwareFaithful, &now, &cfg)
        };
        for _ in 0..3 {
            assert_eq!(s.evaluate(&inp), DisplayMode::Date);
            s.tick_second();
        }
        assert_eq!(s.evaluate(&inp), BLANK);
    }

    #[test]
    fn message_and_editor_take_precedence() {
        let cfg = ClockConfig::default();
        let now = at(9, 0, 0, 1);
        let mut s = Sequencer::new();
        let editing = SequencerInputs {
            editing: true,
            ..inputs(Emulation::Network, &now, &cfg)
        };
        s.show_date(3);
        assert_eq!(s.evaluate(&editing), DisplayMode::Set);

        s.show_message(Message::Done, Some(2));
        assert_eq!(s.evaluate(&editing), DisplayMode::Message(Message::Done));
        s.tick_second();
        s.tick_second();
        assert_eq!(s.evaluate(&editing), DisplayMode::Set);

        s.show_message(Message::Ota, None);
        for _ in 0..100 {
            s.tick_second();
        }
        assert_eq!(s.evaluate(&editing), DisplayMode::Message(Message::Ota));
        s.clear_message();
        assert_eq!(s.evaluate(&editing), DisplayMode::Set);
    }
}
