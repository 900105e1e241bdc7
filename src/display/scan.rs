//! Display scan: advances the digit select and pushes one digit at a time.
//!
//! The core ([`ScanDriver`]) only knows the [`DigitDriver`] seam. The board
//! plugs in [`ShiftRegisterDriver`], which clocks select + segment bytes into
//! a pair of daisy-chained '595 registers.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::buffer::{DisplayBuffer, PHASE_SWITCHING};
use crate::config::{DIGIT_COUNT, LATCH_PULSE_NS};
use crate::error::{Error, Result};

/// Output seam for one multiplexed digit.
///
/// `select_mask` has bit *n* set for digit *n*; `segments` is the glyph byte.
/// Both are logical (active-high) values; polarity is the driver's business.
pub trait DigitDriver {
    fn write(&mut self, select_mask: u8, segments: u8) -> Result<()>;
}

/// Refresh-side state: which digit is lit.
pub struct ScanDriver<D> {
    driver: D,
    index: u8,
}

impl<D: DigitDriver> ScanDriver<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            // First step lands on digit 0.
            index: DIGIT_COUNT as u8 - 1,
        }
    }

    /// Light the next digit and publish it as the current scan phase.
    pub fn step(&mut self, buffer: &DisplayBuffer) -> Result<u8> {
        self.index = (self.index + 1) % DIGIT_COUNT as u8;
        buffer.set_phase(PHASE_SWITCHING);
        self.driver
            .write(1 << self.index, buffer.segments(self.index as usize))?;
        buffer.set_phase(self.index);
        Ok(self.index)
    }

    /// Turn every digit off (e.g. before a restart).
    pub fn blank(&mut self, buffer: &DisplayBuffer) -> Result<()> {
        buffer.set_phase(PHASE_SWITCHING);
        self.driver.write(0, 0)
    }

    pub fn index(&self) -> u8 {
        self.index
    }
}

/// Bit-banged shift-register digit driver.
///
/// Shifts the select byte then the segment byte, MSB first, and latches
/// with a pulse of at least [`LATCH_PULSE_NS`].
pub struct ShiftRegisterDriver<DATA, CLK, LATCH, DELAY> {
    data: DATA,
    clock: CLK,
    latch: LATCH,
    delay: DELAY,
    select_active_low: bool,
    segments_active_low: bool,
}

impl<DATA, CLK, LATCH, DELAY> ShiftRegisterDriver<DATA, CLK, LATCH, DELAY>
where
    DATA: OutputPin,
    CLK: OutputPin,
    LATCH: OutputPin,
    DELAY: DelayNs,
{
    pub fn new(
        data: DATA,
        clock: CLK,
        latch: LATCH,
        delay: DELAY,
        select_active_low: bool,
        segments_active_low: bool,
    ) -> Self {
        Self {
            data,
            clock,
            latch,
            delay,
            select_active_low,
            segments_active_low,
        }
    }

    fn shift_byte(&mut self, byte: u8) -> Result<()> {
        for bit in (0..8).rev() {
            let high = byte & (1 << bit) != 0;
            self.data.set_state(high.into()).map_err(|_| Error::Display)?;
            self.clock.set_high().map_err(|_| Error::Display)?;
            self.clock.set_low().map_err(|_| Error::Display)?;
        }
        Ok(())
    }
}

impl<DATA, CLK, LATCH, DELAY> DigitDriver for ShiftRegisterDriver<DATA, CLK, LATCH, DELAY>
where
    DATA: OutputPin,
    CLK: OutputPin,
    LATCH: OutputPin,
    DELAY: DelayNs,
{
    fn write(&mut self, select_mask: u8, segments: u8) -> Result<()> {
        let select = if self.select_active_low {
            !select_mask
        } else {
            select_mask
        };
        let segs = if self.segments_active_low {
            !segments
        } else {
            segments
        };

        self.shift_byte(select)?;
        self.shift_byte(segs)?;

        self.latch.set_high().map_err(|_| Error::Display)?;
        self.delay.delay_ns(LATCH_PULSE_NS);
        self.latch.set_low().map_err(|_| Error::Display)
    }
}
