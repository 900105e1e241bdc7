//! Top-of-second and half-second edges derived from the time source.

/// Edges produced by one [`PulseGenerator::update`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pulses {
    pub top_of_second: bool,
    pub half_second: bool,
}

impl Pulses {
    pub fn any(self) -> bool {
        self.top_of_second || self.half_second
    }
}

const HALF_SECOND_US: u64 = 500_000;

/// Watches the seconds field and a microsecond clock.
///
/// The top edge fires when the seconds field changes; the half edge fires
/// once, 500 ms of local time after that. Nothing fires until the first
/// change is seen, since the phase within the current second is unknown.
#[derive(Clone, Copy, Debug)]
pub struct PulseGenerator {
    last_second: Option<u8>,
    top_us: Option<u64>,
    half_done: bool,
}

impl PulseGenerator {
    pub const fn new() -> Self {
        Self {
            last_second: None,
            top_us: None,
            half_done: true,
        }
    }

    pub fn update(&mut self, second: u8, now_us: u64) -> Pulses {
        let mut out = Pulses::default();

        if self.last_second.is_some_and(|prev| prev != second) {
            out.top_of_second = true;
            self.top_us = Some(now_us);
            self.half_done = false;
        }
        self.last_second = Some(second);

        if !self.half_done {
            if let Some(top) = self.top_us {
                if now_us.saturating_sub(top) >= HALF_SECOND_US {
                    out.half_second = true;
                    self.half_done = true;
                }
            }
        }
        out
    }
}

impl Default for PulseGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_silent() {
        let mut g = PulseGenerator::new();
        assert_eq!(g.update(10, 0), Pulses::default());
        assert_eq!(g.update(10, 700_000), Pulses::default());
    }

    #[test]
    fn top_then_half_once_per_second() {
        let mut g = PulseGenerator::new();
        g.update(10, 0);
        let p = g.update(11, 300_000);
        assert!(p.top_of_second && !p.half_second);
        assert!(!g.update(11, 600_000).any());
        assert!(g.update(11, 800_000).half_second);
        assert!(!g.update(11, 900_000).any());
        let p = g.update(12, 1_300_000);
        assert!(p.top_of_second);
    }

    #[test]
    fn wraps_from_59_to_0() {
        let mut g = PulseGenerator::new();
        g.update(59, 0);
        assert!(g.update(0, 10).top_of_second);
    }
}
