//! Wall-clock types, the time collaborators and their reconciliation.
//!
//! Two clocks are involved:
//!
//! - a [`TimeSource`], the authoritative clock the display follows (kept in
//!   step by NTP in network mode, seeded from the RTC in hardware mode);
//! - a battery-backed [`BackupClock`] with two alarm slots. Slot 1 mirrors the
//!   user alarm; slot 2 is the backup-validity marker: an RTC reading older
//!   than the marker means the RTC lost power and cannot be trusted.
//!
//! Calendar arithmetic (month lengths, weekdays, time zones) belongs to the
//! collaborators, not to this crate.

use crate::config::{MAX_RESYNC_ATTEMPTS, SYNC_CHECK_SECS};
use crate::error::Result;

pub const SECONDS_PER_DAY: u32 = 86_400;

/// Broken-down local time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    /// 0 = Sunday.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Default for DateTime {
    fn default() -> Self {
        Self {
            year: 2000,
            month: 1,
            day: 1,
            weekday: 6,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }
}

impl DateTime {
    pub fn seconds_of_day(&self) -> u32 {
        self.hour as u32 * 3_600 + self.minute as u32 * 60 + self.second as u32
    }

    pub fn minute_of_day(&self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }

    pub fn with_time(self, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour,
            minute,
            second,
            ..self
        }
    }

    pub fn with_date(self, month: u8, day: u8) -> Self {
        Self { month, day, ..self }
    }

    /// Ordering key at hour granularity (the RTC alarm comparison unit).
    fn hour_key(&self) -> u32 {
        ((self.year as u32 * 13 + self.month as u32) * 32 + self.day as u32) * 24 + self.hour as u32
    }

    /// Strictly earlier than `other`, compared by date and hour.
    pub fn is_before_hour(&self, other: &DateTime) -> bool {
        self.hour_key() < other.hour_key()
    }
}

/// The clock the display follows.
pub trait TimeSource {
    fn now(&mut self) -> Result<DateTime>;
    fn set(&mut self, dt: &DateTime) -> Result<()>;
    /// Last synchronisation is older than three sync intervals.
    fn is_stale(&self) -> bool;
}

/// RTC alarm slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmSlot {
    /// User alarm mirror.
    One,
    /// Backup-validity marker.
    Two,
}

/// Battery-backed real-time clock.
pub trait BackupClock {
    fn now(&mut self) -> Result<DateTime>;
    fn adjust(&mut self, dt: &DateTime) -> Result<()>;
    fn set_alarm(&mut self, slot: AlarmSlot, dt: &DateTime) -> Result<()>;
    fn clear_alarm(&mut self, slot: AlarmSlot) -> Result<()>;
    fn alarm(&mut self, slot: AlarmSlot) -> Result<Option<DateTime>>;
}

/// Can the RTC's time be trusted?
///
/// Requires a marker and an RTC reading that is not older than it. Any
/// communication failure counts as invalid.
pub fn backup_valid<B: BackupClock>(backup: &mut B) -> bool {
    let marker = match backup.alarm(AlarmSlot::Two) {
        Ok(Some(m)) => m,
        Ok(None) => {
            info!("RTC: no validity marker");
            return false;
        }
        Err(e) => {
            warn!("RTC: marker read failed: {:?}", e);
            return false;
        }
    };
    match backup.now() {
        Ok(now) if !now.is_before_hour(&marker) => true,
        Ok(_) => {
            warn!("RTC: time older than validity marker");
            false
        }
        Err(e) => {
            warn!("RTC: read failed: {:?}", e);
            false
        }
    }
}

/// Copy the RTC into the time source if the RTC is trustworthy.
/// Returns whether the time source now holds a known time.
pub fn seed_from_backup<T: TimeSource, B: BackupClock>(time: &mut T, backup: &mut B) -> bool {
    if !backup_valid(backup) {
        return false;
    }
    match backup.now().and_then(|now| time.set(&now)) {
        Ok(()) => {
            info!("Time: seeded from RTC");
            true
        }
        Err(e) => {
            warn!("Time: seeding from RTC failed: {:?}", e);
            false
        }
    }
}

/// Write `dt` to the RTC and move the validity marker to it.
pub fn store_backup<B: BackupClock>(backup: &mut B, dt: &DateTime) -> Result<()> {
    backup.adjust(dt)?;
    backup.set_alarm(AlarmSlot::Two, dt)
}

/// Escalation step requested by the [`SyncSupervisor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncAction {
    Resync,
    ResetNetwork,
    Restart,
}

/// Checks sync staleness every [`SYNC_CHECK_SECS`] and escalates:
/// up to [`MAX_RESYNC_ATTEMPTS`] resyncs, then a network reset, then a restart.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncSupervisor {
    seconds: u32,
    attempts: u8,
    network_reset: bool,
}

impl SyncSupervisor {
    pub const fn new() -> Self {
        Self {
            seconds: 0,
            attempts: 0,
            network_reset: false,
        }
    }

    /// Call once per second.
    pub fn tick_second(&mut self, stale: bool) -> Option<SyncAction> {
        self.seconds += 1;
        if self.seconds < SYNC_CHECK_SECS {
            return None;
        }
        self.seconds = 0;

        if !stale {
            if self.attempts > 0 || self.network_reset {
                info!("Sync: recovered");
            }
            self.attempts = 0;
            self.network_reset = false;
            return None;
        }

        if self.attempts < MAX_RESYNC_ATTEMPTS {
            self.attempts += 1;
            warn!("Sync: stale, resync attempt {}", self.attempts);
            Some(SyncAction::Resync)
        } else if !self.network_reset {
            self.network_reset = true;
            warn!("Sync: resync failed, resetting network");
            Some(SyncAction::ResetNetwork)
        } else {
            error!("Sync: still stale after network reset");
            Some(SyncAction::Restart)
        }
    }
}
