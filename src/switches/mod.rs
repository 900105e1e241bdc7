//! Logical switches and the scan-phase lookup table.
//!
//! Seven momentary switches share two sense lines with the display scan:
//! whichever digit is selected decides which switch pair the lines expose.
//! The eighth switch (`Hold`) has a direct line of its own.

pub mod debounce;
pub mod mux;

pub use debounce::Debouncer;
pub use mux::{MainsDetector, MuxReader};

use crate::config::DIGIT_COUNT;

/// Logical switch identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SwitchId {
    TimeSet = 0,
    AlarmDate = 1,
    HourMonth = 2,
    MinDay = 3,
    SnoozeDate = 4,
    AlarmEnAutoDate = 5,
    Mode12_24 = 6,
    Hold = 7,
}

impl SwitchId {
    pub const ALL: [SwitchId; 8] = [
        SwitchId::TimeSet,
        SwitchId::AlarmDate,
        SwitchId::HourMonth,
        SwitchId::MinDay,
        SwitchId::SnoozeDate,
        SwitchId::AlarmEnAutoDate,
        SwitchId::Mode12_24,
        SwitchId::Hold,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Compact set of switches (one bit per [`SwitchId`]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SwitchSet(u8);

impl SwitchSet {
    pub const EMPTY: SwitchSet = SwitchSet(0);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn with(self, id: SwitchId) -> Self {
        Self(self.0 | id.bit())
    }

    pub fn insert(&mut self, id: SwitchId) {
        self.0 |= id.bit();
    }

    pub const fn contains(self, id: SwitchId) -> bool {
        self.0 & id.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Switches exposed on the two sense lines during one scan phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseSwitches {
    pub line_a: Option<SwitchId>,
    pub line_b: Option<SwitchId>,
}

impl PhaseSwitches {
    const NONE: PhaseSwitches = PhaseSwitches {
        line_a: None,
        line_b: None,
    };

    const fn pair(a: SwitchId, b: SwitchId) -> Self {
        Self {
            line_a: Some(a),
            line_b: Some(b),
        }
    }
}

/// Digit-select index (0-based) → switches wired to that digit's select line.
///
/// Remap here when the sense wiring differs.
pub static SCAN_TABLE: [PhaseSwitches; DIGIT_COUNT] = [
    PhaseSwitches::NONE,
    PhaseSwitches::pair(SwitchId::TimeSet, SwitchId::AlarmDate),
    PhaseSwitches::pair(SwitchId::HourMonth, SwitchId::MinDay),
    PhaseSwitches::pair(SwitchId::SnoozeDate, SwitchId::AlarmEnAutoDate),
    PhaseSwitches {
        line_a: Some(SwitchId::Mode12_24),
        line_b: None,
    },
    PhaseSwitches::NONE,
];

/// Scan phase that exposes `id`, if it is multiplexed at all.
pub fn phase_of(table: &[PhaseSwitches], id: SwitchId) -> Option<usize> {
    table
        .iter()
        .position(|p| p.line_a == Some(id) || p.line_b == Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_multiplexed_switch_has_exactly_one_phase() {
        for id in SwitchId::ALL.iter().copied().filter(|&s| s != SwitchId::Hold) {
            let count = SCAN_TABLE
                .iter()
                .filter(|p| p.line_a == Some(id) || p.line_b == Some(id))
                .count();
            assert_eq!(count, 1, "{:?}", id);
        }
        assert_eq!(phase_of(&SCAN_TABLE, SwitchId::Hold), None);
    }

    #[test]
    fn table_matches_wiring() {
        assert_eq!(phase_of(&SCAN_TABLE, SwitchId::TimeSet), Some(1));
        assert_eq!(phase_of(&SCAN_TABLE, SwitchId::MinDay), Some(2));
        assert_eq!(phase_of(&SCAN_TABLE, SwitchId::AlarmEnAutoDate), Some(3));
        assert_eq!(phase_of(&SCAN_TABLE, SwitchId::Mode12_24), Some(4));
        assert_eq!(SCAN_TABLE[0], PhaseSwitches::NONE);
        assert_eq!(SCAN_TABLE[5], PhaseSwitches::NONE);
    }

    #[test]
    fn switch_set_bits() {
        let set = SwitchSet::EMPTY
            .with(SwitchId::HourMonth)
            .with(SwitchId::MinDay);
        assert!(set.contains(SwitchId::HourMonth));
        assert!(set.contains(SwitchId::MinDay));
        assert!(!set.contains(SwitchId::TimeSet));
        assert_eq!(set.bits(), 0b0000_1100);
        assert!(SwitchSet::EMPTY.is_empty());
    }
}
