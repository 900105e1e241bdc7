//! Software clock anchored to the monotonic timer.
//!
//! The anchor pairs a UTC epoch (µs) with the `Instant` it was taken at.
//! NTP results and user edits both move the anchor; only NTP refreshes the
//! sync time that [`TimeSource::is_stale`] looks at.

use core::cell::Cell;

use defmt::{debug, info};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Instant};
use jiff::civil;
use jiff::tz::{Offset, TimeZone};
use jiff::Timestamp;
use mk5017::config::{NTP_INTERVAL_SECS, UTC_OFFSET_HOURS};
use mk5017::{DateTime, Error, Result, TimeSource};

/// 2000-01-01T00:00:00Z
const EPOCH_2000_US: i64 = 946_684_800_000_000;

#[derive(Clone, Copy)]
struct Anchor {
    epoch_us: i64,
    at: Instant,
    synced_at: Option<Instant>,
}

static ANCHOR: Mutex<CriticalSectionRawMutex, Cell<Anchor>> = Mutex::new(Cell::new(Anchor {
    epoch_us: EPOCH_2000_US,
    at: Instant::from_ticks(0),
    synced_at: None,
}));

/// Record an NTP result (UTC µs since the Unix epoch).
pub fn apply_ntp(epoch_us: i64) {
    let now = Instant::now();
    ANCHOR.lock(|a| {
        a.set(Anchor {
            epoch_us,
            at: now,
            synced_at: Some(now),
        })
    });
    info!("Clock: synced to {} µs", epoch_us);
}

fn current_us() -> i64 {
    let a = ANCHOR.lock(Cell::get);
    a.epoch_us + (Instant::now() - a.at).as_micros() as i64
}

pub struct SoftClock {
    tz: TimeZone,
}

impl SoftClock {
    pub fn new() -> Self {
        Self {
            tz: TimeZone::fixed(Offset::constant(UTC_OFFSET_HOURS)),
        }
    }
}

impl TimeSource for SoftClock {
    fn now(&mut self) -> Result<DateTime> {
        let ts = Timestamp::from_microsecond(current_us()).map_err(|_| Error::TimeSource)?;
        let dt = self.tz.to_datetime(ts);
        Ok(DateTime {
            year: dt.year() as u16,
            month: dt.month() as u8,
            day: dt.day() as u8,
            weekday: dt.weekday().to_sunday_zero_offset() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
        })
    }

    fn set(&mut self, dt: &DateTime) -> Result<()> {
        let year = dt.year as i16;
        let month = dt.month as i8;
        // The editor does not know month lengths; clamp here.
        let last = civil::Date::new(year, month, 1)
            .map_err(|_| Error::TimeSource)?
            .days_in_month();
        let day = (dt.day as i8).clamp(1, last);
        let civil = civil::DateTime::new(
            year,
            month,
            day,
            dt.hour as i8,
            dt.minute as i8,
            dt.second as i8,
            0,
        )
        .map_err(|_| Error::TimeSource)?;
        let epoch_us = self
            .tz
            .to_timestamp(civil)
            .map_err(|_| Error::TimeSource)?
            .as_microsecond();

        let now = Instant::now();
        ANCHOR.lock(|a| {
            let prev = a.get();
            a.set(Anchor {
                epoch_us,
                at: now,
                synced_at: prev.synced_at,
            })
        });
        debug!("Clock: set to {}", epoch_us);
        Ok(())
    }

    fn is_stale(&self) -> bool {
        let limit = Duration::from_secs(3 * NTP_INTERVAL_SECS);
        ANCHOR
            .lock(Cell::get)
            .synced_at
            .map_or(true, |t| Instant::now() - t > limit)
    }
}
