//! Alarm state machine.
//!
//! ```text
//! Idle ──enabled──▶ Armed ──time == alarm──▶ Sounding ──snooze──▶ Snooze
//!   ▲                                          │  ▲                  │
//!   └──── disabled / 60 min since ring start ──┘  └──── +7 min ──────┘
//! ```
//!
//! While sounding, a tone burst starts on each top-of-second edge and stops
//! on the following half-second edge. Every other state is silent.

use crate::config::{ALARM_MAX_SECS, SNOOZE_SECS};
use crate::time::SECONDS_PER_DAY;
use crate::timing::Pulses;

/// Minute-granular user alarm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Alarm {
    pub hour: u8,
    pub minute: u8,
    pub enabled: bool,
    /// Has been set at least once (editor seeds from it).
    pub set: bool,
}

impl Alarm {
    pub fn seconds_of_day(&self) -> u32 {
        self.hour as u32 * 3_600 + self.minute as u32 * 60
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmState {
    Idle,
    Armed,
    Sounding,
    Snooze,
}

/// Request for the tone output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ToneCommand {
    Start,
    Stop,
}

/// Seconds from `from` to `to`, wrapping at midnight.
fn elapsed(from: u32, to: u32) -> u32 {
    (to + SECONDS_PER_DAY - from % SECONDS_PER_DAY) % SECONDS_PER_DAY
}

pub struct AlarmEngine {
    alarm: Alarm,
    state: AlarmState,
    ring_start: u32,
    snooze_start: u32,
    tone_on: bool,
}

impl AlarmEngine {
    pub const fn new() -> Self {
        Self {
            alarm: Alarm {
                hour: 0,
                minute: 0,
                enabled: false,
                set: false,
            },
            state: AlarmState::Idle,
            ring_start: 0,
            snooze_start: 0,
            tone_on: false,
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn alarm(&self) -> &Alarm {
        &self.alarm
    }

    pub fn is_enabled(&self) -> bool {
        self.alarm.enabled
    }

    /// Stored alarm for seeding the editor.
    pub fn stored(&self) -> Option<(u8, u8)> {
        self.alarm.set.then_some((self.alarm.hour, self.alarm.minute))
    }

    /// Snooze wake-up time (seconds of day), when snoozing.
    pub fn wake_at(&self) -> Option<u32> {
        (self.state == AlarmState::Snooze)
            .then(|| (self.snooze_start + SNOOZE_SECS) % SECONDS_PER_DAY)
    }

    /// Store a new alarm time (seconds forced to zero) and mark it set.
    pub fn set_time(&mut self, hour: u8, minute: u8) {
        self.alarm.hour = hour;
        self.alarm.minute = minute;
        self.alarm.set = true;
        info!("Alarm: set to {}:{}", hour, minute);
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Option<ToneCommand> {
        self.alarm.enabled = enabled;
        info!("Alarm: enabled = {}", enabled);
        if enabled {
            None
        } else {
            self.transition(AlarmState::Idle)
        }
    }

    pub fn toggle_enabled(&mut self) -> Option<ToneCommand> {
        self.set_enabled(!self.alarm.enabled)
    }

    /// Snooze request. Ignored unless sounding.
    pub fn snooze(&mut self, now_sod: u32) -> Option<ToneCommand> {
        if self.state != AlarmState::Sounding {
            return None;
        }
        self.snooze_start = now_sod;
        self.transition(AlarmState::Snooze)
    }

    /// Advance with the current time of day and this cycle's edges.
    pub fn tick(&mut self, now_sod: u32, pulses: Pulses) -> Option<ToneCommand> {
        if !self.alarm.enabled {
            return self.transition(AlarmState::Idle);
        }

        match self.state {
            AlarmState::Idle => {
                self.transition(AlarmState::Armed);
                self.check_armed(now_sod, pulses)
            }
            AlarmState::Armed => self.check_armed(now_sod, pulses),
            AlarmState::Sounding => {
                if elapsed(self.ring_start, now_sod) >= ALARM_MAX_SECS {
                    warn!("Alarm: no response, silencing");
                    return self.transition(AlarmState::Idle);
                }
                if pulses.top_of_second && !self.tone_on {
                    self.tone_on = true;
                    Some(ToneCommand::Start)
                } else if pulses.half_second && self.tone_on {
                    self.tone_on = false;
                    Some(ToneCommand::Stop)
                } else {
                    None
                }
            }
            AlarmState::Snooze => {
                if elapsed(self.ring_start, now_sod) >= ALARM_MAX_SECS {
                    return self.transition(AlarmState::Idle);
                }
                if elapsed(self.snooze_start, now_sod) >= SNOOZE_SECS {
                    self.start_sounding(pulses)
                } else {
                    None
                }
            }
        }
    }

    fn check_armed(&mut self, now_sod: u32, pulses: Pulses) -> Option<ToneCommand> {
        if now_sod == self.alarm.seconds_of_day() {
            self.ring_start = now_sod;
            self.start_sounding(pulses)
        } else {
            None
        }
    }

    /// Enter `Sounding`; a top-of-second edge in the same cycle opens the
    /// first burst.
    fn start_sounding(&mut self, pulses: Pulses) -> Option<ToneCommand> {
        self.transition(AlarmState::Sounding);
        if pulses.top_of_second && !self.tone_on {
            self.tone_on = true;
            return Some(ToneCommand::Start);
        }
        None
    }

    /// Change state; leaving `Sounding` always silences.
    fn transition(&mut self, next: AlarmState) -> Option<ToneCommand> {
        if self.state == next {
            return None;
        }
        info!("Alarm: {:?} -> {:?}", self.state, next);
        self.state = next;
        if next != AlarmState::Sounding && self.tone_on {
            self.tone_on = false;
            return Some(ToneCommand::Stop);
        }
        None
    }
}

impl Default for AlarmEngine {
    fn default() -> Self {
        Self::new()
    }
}
