//! Unified error type for mk5017.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

/// Top-level error type used across the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Storage
    /// Non-volatile byte store read/write/commit failed.
    Storage(StorageError),

    // Time
    /// The battery-backed clock did not answer or rejected a write.
    BackupClock,

    /// The network time source rejected a set request.
    TimeSource,

    // Output peripherals
    /// Shift-register / digit output failed.
    Display,

    /// Pulse-train peripheral refused the waveform or command.
    Tone,

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,

    /// Bounded operation exceeded its wait budget.
    Timeout,
}

/// Subset of storage errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Offset outside the reserved region.
    OutOfRange(usize),
    /// Underlying flash read failed.
    ReadFailed,
    /// Underlying flash write/erase failed.
    WriteFailed,
}

// Convenience conversions

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::Storage(e)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
