//! Display data shared between the main loop and the refresh task.
//!
//! Single writer (main loop) for the segment bytes, single writer (refresh
//! task) for the scan phase. Entries are independent atomics, so a reader may
//! see a frame half-updated; the next refresh pass corrects it.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::config::DIGIT_COUNT;

/// Published while the refresh task is between digits.
pub const PHASE_SWITCHING: u8 = u8::MAX;

pub struct DisplayBuffer {
    digits: [AtomicU8; DIGIT_COUNT],
    phase: AtomicU8,
}

impl DisplayBuffer {
    pub const fn new() -> Self {
        Self {
            digits: [const { AtomicU8::new(0) }; DIGIT_COUNT],
            phase: AtomicU8::new(PHASE_SWITCHING),
        }
    }

    /// Publish a whole frame (main loop).
    pub fn store(&self, frame: &[u8; DIGIT_COUNT]) {
        for (slot, &seg) in self.digits.iter().zip(frame.iter()) {
            slot.store(seg, Ordering::Relaxed);
        }
    }

    /// Segment byte for one position (refresh task). Out of range reads blank.
    pub fn segments(&self, index: usize) -> u8 {
        self.digits
            .get(index)
            .map_or(0, |d| d.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self) -> [u8; DIGIT_COUNT] {
        core::array::from_fn(|i| self.segments(i))
    }

    pub fn set_phase(&self, phase: u8) {
        self.phase.store(phase, Ordering::Release);
    }

    pub fn phase(&self) -> u8 {
        self.phase.load(Ordering::Acquire)
    }

    /// Sample the sense lines with `sample` and attribute the result to a
    /// scan phase. Returns `None` when the refresh task moved to another
    /// digit while sampling.
    pub fn sample_phase<T>(&self, sample: impl FnOnce() -> T) -> Option<(usize, T)> {
        let before = self.phase();
        let value = sample();
        let after = self.phase();
        if before == after && before != PHASE_SWITCHING {
            Some((before as usize, value))
        } else {
            None
        }
    }
}

impl Default for DisplayBuffer {
    fn default() -> Self {
        Self::new()
    }
}
