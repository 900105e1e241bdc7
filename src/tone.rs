//! Alarm tone waveform and the output seam.
//!
//! The waveform is a list of (high, low) pulse pairs in peripheral ticks of
//! [`TONE_TICK_NS`], precomputed once per model and handed to the
//! pulse-train peripheral, which repeats it while playing.

use heapless::Vec;

use crate::config::{TONE_TICK_NS, TONE_WAVEFORM_LEN};
use crate::error::{Error, Result};

/// One period of the square wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulsePair {
    pub high_ticks: u16,
    pub low_ticks: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Waveform {
    pairs: Vec<PulsePair, TONE_WAVEFORM_LEN>,
}

impl Waveform {
    /// 50 % duty square wave at `freq_hz`, `periods` periods long.
    pub fn square(freq_hz: u32, periods: usize) -> Result<Self> {
        if freq_hz == 0 {
            return Err(Error::Tone);
        }
        let ticks_per_sec = 1_000_000_000 / TONE_TICK_NS;
        let period = ticks_per_sec / freq_hz;
        let high = period / 2;
        let low = period - high;
        let high_ticks = u16::try_from(high).map_err(|_| Error::Tone)?;
        let low_ticks = u16::try_from(low).map_err(|_| Error::Tone)?;
        if high_ticks == 0 {
            return Err(Error::Tone);
        }

        let mut pairs = Vec::new();
        for _ in 0..periods {
            pairs
                .push(PulsePair {
                    high_ticks,
                    low_ticks,
                })
                .map_err(|_| Error::BufferOverflow)?;
        }
        Ok(Self { pairs })
    }

    /// Waveform filling the whole buffer.
    pub fn for_frequency(freq_hz: u32) -> Result<Self> {
        Self::square(freq_hz, TONE_WAVEFORM_LEN)
    }

    pub fn pairs(&self) -> &[PulsePair] {
        &self.pairs
    }

    /// Frequency the waveform encodes (from its first period).
    pub fn frequency_hz(&self) -> u32 {
        self.pairs.first().map_or(0, |p| {
            let period = p.high_ticks as u32 + p.low_ticks as u32;
            (1_000_000_000 / TONE_TICK_NS) / period.max(1)
        })
    }
}

/// Pulse-train output peripheral.
pub trait ToneOutput {
    fn load(&mut self, waveform: &Waveform) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_wave_periods() {
        let w = Waveform::square(1024, 4).unwrap();
        assert_eq!(w.pairs().len(), 4);
        // 1 µs ticks: 976 per period at 1024 Hz.
        assert_eq!(w.pairs()[0], PulsePair { high_ticks: 488, low_ticks: 488 });
        assert_eq!(w.frequency_hz(), 1024);
    }

    #[test]
    fn odd_period_puts_extra_tick_low() {
        let w = Waveform::square(800, 1).unwrap();
        let p = w.pairs()[0];
        assert_eq!(p.high_ticks + p.low_ticks, 1_250);
        assert!(p.low_ticks >= p.high_ticks);
    }

    #[test]
    fn rejects_bad_requests() {
        assert_eq!(Waveform::square(0, 1), Err(Error::Tone));
        assert_eq!(Waveform::square(1, 1), Err(Error::Tone));
        assert_eq!(
            Waveform::square(1024, TONE_WAVEFORM_LEN + 1),
            Err(Error::BufferOverflow)
        );
        assert_eq!(Waveform::for_frequency(2048).unwrap().pairs().len(), TONE_WAVEFORM_LEN);
    }
}
