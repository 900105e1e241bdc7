//! Persistent settings.
//!
//! Storage layout (byte offsets in the non-volatile store):
//!   - 0: emulation (0 = network, 1 = hardware-faithful)
//!   - 1: model (0-3 = A-D, 4 = unset)
//!   - 2: flags (bit 0 = mains detector disabled, bit 1 = 12-hour display)
//!
//! Out-of-range values decode to defaults. The board keeps these bytes in a
//! RAM [`ByteImage`] and flushes it to flash after a commit.

use crate::config::STORAGE_BYTES;
use crate::emulation::{Emulation, EmulationInfo, Model};
use crate::error::{Result, StorageError};

pub const OFFSET_EMULATION: usize = 0;
pub const OFFSET_MODEL: usize = 1;
pub const OFFSET_FLAGS: usize = 2;

const FLAG_MAINS_DISABLED: u8 = 1 << 0;
const FLAG_TWELVE_HOUR: u8 = 1 << 1;

/// Byte-addressed non-volatile store with an explicit commit.
pub trait ByteStore {
    fn read(&mut self, offset: usize) -> Result<u8>;
    fn write(&mut self, offset: usize, value: u8) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
}

/// Everything that survives a restart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PersistedState {
    pub info: EmulationInfo,
    pub mains_detector_disabled: bool,
    pub twelve_hour: bool,
}

impl PersistedState {
    /// Load from `store`. Read failures and bad values fall back to defaults.
    pub fn load<S: ByteStore>(store: &mut S) -> Self {
        let mut read = |offset| match store.read(offset) {
            Ok(b) => b,
            Err(e) => {
                warn!("Storage: read {} failed: {:?}", offset, e);
                0
            }
        };
        let emulation_byte = read(OFFSET_EMULATION);
        let model_byte = read(OFFSET_MODEL);
        let flags = read(OFFSET_FLAGS);

        if emulation_byte > 1 {
            warn!("Storage: emulation byte {} out of range", emulation_byte);
        }
        if model_byte > 4 {
            warn!("Storage: model byte {} out of range", model_byte);
        }

        let state = Self {
            info: EmulationInfo {
                emulation: Emulation::from_byte(emulation_byte),
                model: Model::from_byte(model_byte),
            },
            mains_detector_disabled: flags & FLAG_MAINS_DISABLED != 0,
            twelve_hour: flags & FLAG_TWELVE_HOUR != 0,
        };
        info!("Storage: loaded {:?}", state);
        state
    }

    /// Write all fields and commit.
    pub fn save<S: ByteStore>(&self, store: &mut S) -> Result<()> {
        let mut flags = 0;
        if self.mains_detector_disabled {
            flags |= FLAG_MAINS_DISABLED;
        }
        if self.twelve_hour {
            flags |= FLAG_TWELVE_HOUR;
        }
        store.write(OFFSET_EMULATION, self.info.emulation.to_byte())?;
        store.write(OFFSET_MODEL, self.info.model.to_byte())?;
        store.write(OFFSET_FLAGS, flags)?;
        store.commit()?;
        debug!("Storage: saved {:?}", self);
        Ok(())
    }
}

/// RAM image of the persisted bytes with a dirty flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteImage {
    bytes: [u8; STORAGE_BYTES],
    /// True if the image differs from flash.
    dirty: bool,
    /// A commit is waiting to be flushed.
    pending: bool,
}

impl ByteImage {
    pub const fn new() -> Self {
        Self {
            bytes: [0; STORAGE_BYTES],
            dirty: false,
            pending: false,
        }
    }

    /// Image restored from flash contents.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut bytes = [0; STORAGE_BYTES];
        for (dst, src) in bytes.iter_mut().zip(data) {
            *dst = *src;
        }
        Self {
            bytes,
            dirty: false,
            pending: false,
        }
    }

    pub fn bytes(&self) -> &[u8; STORAGE_BYTES] {
        &self.bytes
    }

    /// Committed changes not yet written to flash.
    pub fn needs_flush(&self) -> bool {
        self.pending && self.dirty
    }

    pub fn mark_flushed(&mut self) {
        self.dirty = false;
        self.pending = false;
    }
}

impl Default for ByteImage {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteStore for ByteImage {
    fn read(&mut self, offset: usize) -> Result<u8> {
        self.bytes
            .get(offset)
            .copied()
            .ok_or(StorageError::OutOfRange(offset).into())
    }

    fn write(&mut self, offset: usize, value: u8) -> Result<()> {
        let slot = self
            .bytes
            .get_mut(offset)
            .ok_or(StorageError::OutOfRange(offset))?;
        if *slot != value {
            *slot = value;
            self.dirty = true;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.pending = self.dirty;
        Ok(())
    }
}
