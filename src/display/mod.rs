//! Multiplexed 6-digit seven-segment display.
//!
//! - [`segments`]: glyph and message tables
//! - [`render`]: logical content → segment bytes
//! - [`buffer`]: lock-free frame shared with the refresh task
//! - [`scan`]: refresh-side digit driver
//! - [`sequencer`]: what to show this second

pub mod buffer;
pub mod render;
pub mod scan;
pub mod segments;
pub mod sequencer;

pub use buffer::DisplayBuffer;
pub use render::RenderOptions;
pub use scan::{DigitDriver, ScanDriver, ShiftRegisterDriver};
pub use segments::Message;
pub use sequencer::Sequencer;

/// What the display is currently showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayMode {
    Time,
    Date,
    /// Set-mode editor buffer.
    Set,
    Message(Message),
}
