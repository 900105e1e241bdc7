//! MK5017 clock-driver emulator.
//!
//! Everything that decides what the clock shows and does lives in this
//! library and runs on the host: switch debouncing and multiplexing, the
//! display pipeline, the set-mode editor, the alarm, touch handling and the
//! time reconciliation. Hardware and networking sit behind small traits
//! ([`TimeSource`], [`BackupClock`], [`ByteStore`], [`DigitDriver`],
//! [`ToneOutput`]) implemented by the ESP32 binary in `main.rs`.
//!
//! Usage: `cargo test --lib --tests`
//!
//! Note: The embedded binary (`--features embedded`) is `#![no_std]` +
//! `#![no_main]` and links against this library.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod alarm;
pub mod app;
pub mod config;
pub mod display;
pub mod ds3231;
pub mod editor;
pub mod emulation;
pub mod error;
pub mod gestures;
pub mod storage;
pub mod switches;
pub mod time;
pub mod timing;
pub mod tone;
pub mod touch;

pub use app::{ClockApp, Inputs, Request};
pub use config::ClockConfig;
pub use display::{DigitDriver, DisplayBuffer, DisplayMode, ScanDriver, ShiftRegisterDriver};
pub use ds3231::Ds3231;
pub use emulation::{Emulation, EmulationInfo, Model};
pub use error::{Error, Result};
pub use storage::{ByteImage, ByteStore, PersistedState};
pub use time::{AlarmSlot, BackupClock, DateTime, TimeSource};
pub use tone::{ToneOutput, Waveform};
