//! Emulation mode, clock models and boot-time mode gestures.
//!
//! The emulation is chosen at boot from storage and only changes through
//! an explicit gesture followed by a restart.

use crate::switches::{SwitchId, SwitchSet};

/// Top-level behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Emulation {
    /// Network-time driven clock with schedules and touch.
    #[default]
    Network,
    /// Faithful MK5017: RTC time, switch semantics of the original chip.
    HardwareFaithful,
}

impl Emulation {
    /// Decode a persisted byte; unknown values fall back to `Network`.
    pub fn from_byte(b: u8) -> Self {
        match b {
            1 => Emulation::HardwareFaithful,
            _ => Emulation::Network,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Emulation::Network => 0,
            Emulation::HardwareFaithful => 1,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Emulation::Network => Emulation::HardwareFaithful,
            Emulation::HardwareFaithful => Emulation::Network,
        }
    }
}

/// Physical clock variant driven in hardware-faithful mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Model {
    #[default]
    A,
    B,
    C,
    /// Calendar model (GC-1092D style): no alarm, auto-date.
    D,
    /// Not chosen yet; forces the model editor.
    Unset,
}

/// Number of selectable models.
pub const MODEL_COUNT: u8 = 4;

/// Fixed per-model behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelTraits {
    pub has_alarm: bool,
    pub auto_date: bool,
    pub pm_dot: bool,
    pub tone_hz: u32,
}

static MODEL_TRAITS: [ModelTraits; MODEL_COUNT as usize] = [
    ModelTraits { has_alarm: true, auto_date: false, pm_dot: true, tone_hz: 1024 },
    ModelTraits { has_alarm: true, auto_date: false, pm_dot: false, tone_hz: 2048 },
    ModelTraits { has_alarm: true, auto_date: false, pm_dot: true, tone_hz: 800 },
    ModelTraits { has_alarm: false, auto_date: true, pm_dot: true, tone_hz: 1024 },
];

impl Model {
    /// Decode a persisted byte; unknown values fall back to `A`.
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => Model::A,
            1 => Model::B,
            2 => Model::C,
            3 => Model::D,
            4 => Model::Unset,
            _ => Model::A,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Model::A => 0,
            Model::B => 1,
            Model::C => 2,
            Model::D => 3,
            Model::Unset => 4,
        }
    }

    /// Model for an editor index (wraps modulo [`MODEL_COUNT`]).
    pub fn from_index(i: u8) -> Self {
        Self::from_byte(i % MODEL_COUNT)
    }

    pub fn traits(self) -> Option<&'static ModelTraits> {
        MODEL_TRAITS.get(self.to_byte() as usize)
    }
}

/// Persisted emulation + model pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EmulationInfo {
    pub emulation: Emulation,
    pub model: Model,
}

impl EmulationInfo {
    pub fn is_hardware(&self) -> bool {
        self.emulation == Emulation::HardwareFaithful
    }

    /// Hardware-faithful logic cannot run until a model is picked.
    pub fn needs_model(&self) -> bool {
        self.is_hardware() && self.model == Model::Unset
    }

    /// Alarm engine and ALARM editor available.
    pub fn has_alarm(&self) -> bool {
        !self.is_hardware() || self.model.traits().is_some_and(|t| t.has_alarm)
    }

    pub fn auto_date_capable(&self) -> bool {
        self.is_hardware() && self.model.traits().is_some_and(|t| t.auto_date)
    }

    /// The snooze switch snoozes (rather than showing the date).
    pub fn snooze_allowed(&self) -> bool {
        !self.is_hardware() || !matches!(self.model, Model::D | Model::Unset)
    }

    pub fn pm_dot(&self) -> bool {
        !self.is_hardware() || self.model.traits().is_some_and(|t| t.pm_dot)
    }

    pub fn tone_hz(&self) -> u32 {
        let model = if self.is_hardware() { self.model } else { Model::A };
        model
            .traits()
            .or_else(|| Model::A.traits())
            .map_or(1024, |t| t.tone_hz)
    }
}

/// Switch held while the device boots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootGesture {
    None,
    /// HourMonth held: flip the emulation, persist, restart.
    ToggleEmulation,
    /// MinDay held (hardware-faithful): forget the model, disable the mains
    /// detector, clear the backup marker, restart.
    ResetModel,
}

pub fn boot_gesture(info: &EmulationInfo, held: SwitchSet) -> BootGesture {
    if held.contains(SwitchId::HourMonth) {
        BootGesture::ToggleEmulation
    } else if held.contains(SwitchId::MinDay) && info.is_hardware() {
        BootGesture::ResetModel
    } else {
        BootGesture::None
    }
}
