//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

// Switch sampling

/// A raw switch level must hold this long before it becomes stable (µs).
pub const DEBOUNCE_US: u64 = 1_000;

/// Mains is considered absent after this long without a transition (µs).
pub const MAINS_TIMEOUT_US: u64 = 100_000;

/// Number of logical switches (seven multiplexed + the direct hold line).
pub const SWITCH_COUNT: usize = 8;

// Display

/// Number of digit positions on the display.
pub const DIGIT_COUNT: usize = 6;

/// Refresh interval of one digit position (µs). 6 digits × 2 ms ≈ 83 Hz.
pub const SCAN_INTERVAL_US: u64 = 2_000;

/// Main-loop period (µs). Several passes per scan phase so every phase is
/// sampled at least once.
pub const POLL_INTERVAL_US: u64 = 250;

/// Minimum width of the shift-register latch pulse (ns).
pub const LATCH_PULSE_NS: u32 = 1_000;

/// Digit-select outputs are active-low on the reference board.
pub const DIGIT_SELECT_ACTIVE_LOW: bool = true;

/// Segment outputs are active-high on the reference board.
pub const SEGMENTS_ACTIVE_LOW: bool = false;

/// Default number of seconds a touch- or switch-triggered DATE stays up.
pub const DATE_DISPLAY_SECS: u8 = 3;

/// Transient confirmation messages stay up this many seconds.
pub const MESSAGE_DISPLAY_SECS: u8 = 2;

// Alarm

/// Snooze interval (seconds). 7 minutes.
pub const SNOOZE_SECS: u32 = 420;

/// The alarm silences itself after ringing this long (seconds).
pub const ALARM_MAX_SECS: u32 = 3_600;

/// Pulse-train peripheral tick (ns). 1 µs resolution.
pub const TONE_TICK_NS: u32 = 1_000;

/// Capacity of the precomputed tone waveform (pulse pairs).
pub const TONE_WAVEFORM_LEN: usize = 64;

// Touch

/// The switch-pair touch signal must be stable this long before it is trusted (µs).
pub const TOUCH_SETTLE_US: u64 = 50_000;

/// Other switch activity is ignored this long after the touch pair releases (µs).
pub const TOUCH_COOLDOWN_US: u64 = 500_000;

/// Default capacitive threshold (raw sensor units; lower reading = touched).
pub const TOUCH_THRESHOLD: u16 = 400;

// Gestures

/// TimeSet presses needed to force a restart.
pub const RESTART_TOGGLES: usize = 3;

/// ...within this window (µs).
pub const RESTART_WINDOW_US: u64 = 5_000_000;

/// Delay between the MODEL commit and the restart (ms).
pub const MODEL_RESTART_DELAY_MS: u64 = 2_000;

/// The OTA session reverts after this long without activity (ms).
pub const OTA_IDLE_TIMEOUT_MS: u64 = 600_000;

/// Boot gestures are read after the switches had this long to settle (µs).
pub const BOOT_SETTLE_US: u64 = 50_000;

// Network time

/// Interval between sync-staleness checks (seconds).
pub const SYNC_CHECK_SECS: u32 = 60;

/// Resync attempts before the network stack is reset.
pub const MAX_RESYNC_ATTEMPTS: u8 = 3;

/// NTP refresh interval (seconds). Stale after 3× this.
pub const NTP_INTERVAL_SECS: u64 = 3_600;

/// Wait budget for a single NTP exchange (seconds).
pub const NTP_TIMEOUT_SECS: u64 = 5;

/// Wait budget for WiFi association + DHCP (seconds).
pub const WIFI_CONNECT_TIMEOUT_SECS: u64 = 30;

/// NTP server queried in NETWORK mode.
pub const NTP_SERVER: &str = "pool.ntp.org";

/// Station credentials, baked in at build time.
pub const WIFI_SSID: &str = match option_env!("MK5017_WIFI_SSID") {
    Some(s) => s,
    None => "",
};
pub const WIFI_PASSWORD: &str = match option_env!("MK5017_WIFI_PASSWORD") {
    Some(s) => s,
    None => "",
};

/// Access point raised for OTA sessions.
pub const OTA_AP_SSID: &str = "mk5017-update";
pub const OTA_AP_PASSWORD: &str = "mk5017ota";

/// UDP port the update listener binds to.
pub const OTA_PORT: u16 = 3232;

// GPIO pin assignments (ESP32-WROOM defaults)
//
// Logical names only; the concrete `esp_hal::peripherals::GPIOn` types are
// picked in `main.rs`. Adjust for your PCB.
//
//   Shift data     → GPIO23
//   Shift clock    → GPIO18
//   Shift latch    → GPIO5
//   Sense line A   → GPIO34
//   Sense line B   → GPIO35
//   Hold switch    → GPIO32
//   Mains 50/60 Hz → GPIO33
//   Tone output    → GPIO25 (LEDC channel 0)
//   RTC SDA        → GPIO21
//   RTC SCL        → GPIO22
//
// The reference board has no capacitive pad; the switch-pair heuristic
// stands in for it (`ClockConfig::switch_touch`).

// Persistent storage

/// Fixed local offset from UTC applied by the network clock (hours).
pub const UTC_OFFSET_HOURS: i8 = 1;

/// I2C bus frequency for the RTC (kHz).
pub const RTC_I2C_KHZ: u32 = 100;

/// Flash offset of the settings partition (the `nvs` slot of the default table).
pub const STORAGE_FLASH_START: u32 = 0x9000;

/// Size of the settings partition.
pub const STORAGE_FLASH_SIZE: u32 = 0x6000;

/// Number of persisted bytes mirrored in RAM.
pub const STORAGE_BYTES: usize = 3;

/// Runtime-tunable configuration, seeded from the constants above.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// Start of the daily display window (minutes after midnight).
    pub display_on_minute: u16,
    /// End of the daily display window (minutes after midnight, exclusive).
    pub display_off_minute: u16,
    /// Weekdays the display stays blank in NETWORK mode (bit 0 = Sunday).
    pub blank_days: u8,
    /// Seconds a DATE display lasts.
    pub date_display_secs: u8,
    /// Use the switch-pair heuristic as a touch source (boards without a pad).
    pub switch_touch: bool,
    /// Capacitive crossing threshold.
    pub touch_threshold: u16,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            display_on_minute: 0,
            display_off_minute: 0,
            blank_days: 0,
            date_display_secs: DATE_DISPLAY_SECS,
            switch_touch: false,
            touch_threshold: TOUCH_THRESHOLD,
        }
    }
}
