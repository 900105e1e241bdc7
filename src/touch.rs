//! Touch input: a capacitive pad and a switch-pair heuristic fused into one
//! edge-triggered "touch" event.

use crate::config::{TOUCH_COOLDOWN_US, TOUCH_SETTLE_US};
use crate::switches::{MuxReader, SwitchId};

/// Direction the next crossing is expected in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Crossing {
    /// Reading drops below the threshold (finger arrives).
    Below,
    /// Reading rises back to the threshold (finger leaves).
    Above,
}

/// Capacitive pad edge detector.
///
/// Each crossing flips the armed direction, so touch and release both
/// produce one crossing, and toggles the sticky `active` flag.
#[derive(Clone, Copy, Debug)]
pub struct CapacitiveTouch {
    threshold: u16,
    armed: Crossing,
    active: bool,
}

impl CapacitiveTouch {
    pub const fn new(threshold: u16) -> Self {
        Self {
            threshold,
            armed: Crossing::Below,
            active: false,
        }
    }

    /// Feed one raw reading. Returns `true` on a crossing.
    pub fn sample(&mut self, raw: u16) -> bool {
        let crossed = match self.armed {
            Crossing::Below => raw < self.threshold,
            Crossing::Above => raw >= self.threshold,
        };
        if crossed {
            self.armed = match self.armed {
                Crossing::Below => Crossing::Above,
                Crossing::Above => Crossing::Below,
            };
            self.active = !self.active;
            trace!("Touch: crossing at {}, active = {}", raw, self.active);
        }
        crossed
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn armed(&self) -> Crossing {
        self.armed
    }
}

/// Result of the switch-pair heuristic for one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeuristicOutcome {
    /// The pair is held and has been quiet long enough to trust.
    pub touch: bool,
    /// Other switch actions must be ignored this cycle.
    pub suppress_others: bool,
    /// A lone pair member whose press survived the settle period.
    pub deferred: Option<SwitchId>,
}

/// Emulates the original analog touch plate, which pulled the
/// SnoozeDate + AlarmEnAutoDate lines together.
///
/// The two lines rarely debounce in the same cycle, so a press of either
/// member is held back until the switches have been quiet for
/// [`TOUCH_SETTLE_US`]. If the partner shows up in the meantime the press
/// was half of a touch and is dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct SwitchTouchHeuristic {
    pair_was_active: bool,
    cooldown_until_us: u64,
    pending: Option<SwitchId>,
}

impl SwitchTouchHeuristic {
    pub const fn new() -> Self {
        Self {
            pair_was_active: false,
            cooldown_until_us: 0,
            pending: None,
        }
    }

    pub fn update(&mut self, sw: &MuxReader, now_us: u64) -> HeuristicOutcome {
        let snooze = sw.is_pressed(SwitchId::SnoozeDate);
        let enable = sw.is_pressed(SwitchId::AlarmEnAutoDate);
        let pair = snooze && enable;
        if self.pair_was_active && !pair {
            self.cooldown_until_us = now_us + TOUCH_COOLDOWN_US;
        }
        self.pair_was_active = pair;
        let cooling = now_us < self.cooldown_until_us;

        if pair || cooling {
            self.pending = None;
        } else if sw.pressed_edge(SwitchId::SnoozeDate) {
            self.pending = Some(SwitchId::SnoozeDate);
        } else if sw.pressed_edge(SwitchId::AlarmEnAutoDate) {
            self.pending = Some(SwitchId::AlarmEnAutoDate);
        }

        let settled = now_us.saturating_sub(sw.last_change_us()) >= TOUCH_SETTLE_US;
        let deferred = if settled { self.pending.take() } else { None };
        if let Some(id) = deferred {
            trace!("Touch: {:?} alone, acting", id);
        }
        let unsettled_member = !settled && (snooze || enable || self.pending.is_some());
        HeuristicOutcome {
            touch: pair && settled,
            suppress_others: pair || cooling || unsettled_member,
            deferred,
        }
    }
}

/// Fused touch edge for one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TouchEvent {
    pub rising: bool,
    pub suppress_others: bool,
    /// Pair member press released by the heuristic this cycle.
    pub deferred: Option<SwitchId>,
}

pub struct TouchInterpreter {
    pad: CapacitiveTouch,
    heuristic: SwitchTouchHeuristic,
    last_active: bool,
}

impl TouchInterpreter {
    pub const fn new(threshold: u16) -> Self {
        Self {
            pad: CapacitiveTouch::new(threshold),
            heuristic: SwitchTouchHeuristic::new(),
            last_active: false,
        }
    }

    /// `raw`: capacitive reading, if the board has a pad.
    /// `use_switches`: heuristic enabled (network mode + configuration).
    pub fn update(
        &mut self,
        raw: Option<u16>,
        sw: &MuxReader,
        use_switches: bool,
        now_us: u64,
    ) -> TouchEvent {
        if let Some(raw) = raw {
            self.pad.sample(raw);
        }
        let h = if use_switches {
            self.heuristic.update(sw, now_us)
        } else {
            HeuristicOutcome::default()
        };

        let active = self.pad.is_active() || h.touch;
        let rising = active && !self.last_active;
        self.last_active = active;
        if rising {
            debug!("Touch: event");
        }
        TouchEvent {
            rising,
            suppress_others: h.suppress_others,
            deferred: h.deferred,
        }
    }
}
