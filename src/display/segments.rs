//! Seven-segment glyph and message tables.
//!
//! Bit 0 = segment a … bit 6 = segment g, bit 7 = decimal point.

pub const SEG_DP: u8 = 0x80;
pub const BLANK: u8 = 0x00;
pub const DASH: u8 = 0x40;

/// Decimal digits 0-9.
pub static DIGITS: [u8; 10] = [
    0x3F, // 0
    0x06, // 1
    0x5B, // 2
    0x4F, // 3
    0x66, // 4
    0x6D, // 5
    0x7D, // 6
    0x07, // 7
    0x7F, // 8
    0x6F, // 9
];

pub const GLYPH_A: u8 = 0x77;
pub const GLYPH_B: u8 = 0x7C; // b
pub const GLYPH_C: u8 = 0x39;
pub const GLYPH_D: u8 = 0x5E; // d
pub const GLYPH_E: u8 = 0x79;
pub const GLYPH_N: u8 = 0x54; // n
pub const GLYPH_O: u8 = 0x5C; // o
pub const GLYPH_S: u8 = 0x6D;
pub const GLYPH_T: u8 = 0x78; // t

/// Model letters A, b, C, d by model index.
pub static MODEL_GLYPHS: [u8; 4] = [GLYPH_A, GLYPH_B, GLYPH_C, GLYPH_D];

/// Glyph for a single decimal digit; anything above 9 renders blank.
pub fn digit(value: u8) -> u8 {
    DIGITS.get(value as usize).copied().unwrap_or(BLANK)
}

/// Transient and status messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    /// All segments off.
    Blank,
    /// Commit confirmation.
    Done,
    /// OTA session active.
    Ota,
    /// Please wait / restarting.
    Wait,
}

static MESSAGES: [[u8; 6]; 4] = [
    [BLANK; 6],
    [BLANK, GLYPH_D, GLYPH_O, GLYPH_N, GLYPH_E, BLANK],
    [BLANK, 0x3F, GLYPH_T, GLYPH_A, BLANK, BLANK],
    [DASH; 6],
];

impl Message {
    pub fn segments(self) -> [u8; 6] {
        MESSAGES[self as usize]
    }
}
