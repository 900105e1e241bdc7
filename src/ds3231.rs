//! DS3231 battery-backed RTC as a [`BackupClock`].
//!
//! Register map (BCD, 24-hour mode):
//!   - 0x00-0x06: seconds, minutes, hours, weekday (1-7), date, month
//!     (bit 7 = century), year (00-99)
//!   - 0x07-0x0A: alarm 1 (seconds, minutes, hours, date); user alarm mirror
//!   - 0x0B-0x0D: alarm 2 (minutes, hours, date); backup-validity marker
//!   - 0x0E: control (A1IE, A2IE, INTCN)
//!   - 0x0F: status (OSF, A2F, A1F)
//!
//! A slot counts as set while its interrupt-enable bit is on. The chip stores
//! neither year nor month for alarms; both are rebuilt from the current time.

use embedded_hal::i2c::I2c;

use crate::error::{Error, Result};
use crate::time::{AlarmSlot, BackupClock, DateTime};

/// 7-bit bus address.
pub const ADDRESS: u8 = 0x68;

const REG_TIME: u8 = 0x00;
const REG_ALARM1: u8 = 0x07;
const REG_ALARM2: u8 = 0x0B;
const REG_CONTROL: u8 = 0x0E;
const REG_STATUS: u8 = 0x0F;

const CONTROL_A1IE: u8 = 1 << 0;
const CONTROL_A2IE: u8 = 1 << 1;
const CONTROL_INTCN: u8 = 1 << 2;

const STATUS_A1F: u8 = 1 << 0;
const STATUS_A2F: u8 = 1 << 1;
const STATUS_OSF: u8 = 1 << 7;

const MONTH_CENTURY: u8 = 1 << 7;
/// Alarm mask bit: ignore this field when matching.
const ALARM_MASK: u8 = 1 << 7;

fn bcd(v: u8) -> u8 {
    ((v / 10) << 4) | (v % 10)
}

fn dec(b: u8) -> u8 {
    (b >> 4) * 10 + (b & 0x0F)
}

impl AlarmSlot {
    fn enable_bit(self) -> u8 {
        match self {
            AlarmSlot::One => CONTROL_A1IE,
            AlarmSlot::Two => CONTROL_A2IE,
        }
    }

    fn flag_bit(self) -> u8 {
        match self {
            AlarmSlot::One => STATUS_A1F,
            AlarmSlot::Two => STATUS_A2F,
        }
    }
}

pub struct Ds3231<I> {
    i2c: I,
}

impl<I: I2c> Ds3231<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    pub fn release(self) -> I {
        self.i2c
    }

    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<()> {
        self.i2c.write_read(ADDRESS, &[reg], buf).map_err(|_| {
            warn!("DS3231: read of {=u8:#x} failed", reg);
            Error::BackupClock
        })
    }

    fn write_regs(&mut self, reg: u8, data: &[u8]) -> Result<()> {
        let mut frame = [0u8; 8];
        let len = data.len() + 1;
        let frame = frame.get_mut(..len).ok_or(Error::BufferOverflow)?;
        frame[0] = reg;
        frame[1..].copy_from_slice(data);
        self.i2c.write(ADDRESS, frame).map_err(|_| {
            warn!("DS3231: write of {=u8:#x} failed", reg);
            Error::BackupClock
        })
    }

    fn modify(&mut self, reg: u8, clear: u8, set: u8) -> Result<()> {
        let mut v = [0u8];
        self.read_regs(reg, &mut v)?;
        self.write_regs(reg, &[(v[0] & !clear) | set])
    }

    /// The oscillator stopped at some point since the time was last set.
    pub fn lost_power(&mut self) -> Result<bool> {
        let mut status = [0u8];
        self.read_regs(REG_STATUS, &mut status)?;
        Ok(status[0] & STATUS_OSF != 0)
    }
}

impl<I: I2c> BackupClock for Ds3231<I> {
    fn now(&mut self) -> Result<DateTime> {
        let mut r = [0u8; 7];
        self.read_regs(REG_TIME, &mut r)?;
        let century = if r[5] & MONTH_CENTURY != 0 { 100 } else { 0 };
        Ok(DateTime {
            second: dec(r[0] & 0x7F),
            minute: dec(r[1] & 0x7F),
            hour: dec(r[2] & 0x3F),
            weekday: dec(r[3] & 0x07).saturating_sub(1),
            day: dec(r[4] & 0x3F),
            month: dec(r[5] & 0x1F),
            year: 2000 + century + dec(r[6]) as u16,
        })
    }

    fn adjust(&mut self, dt: &DateTime) -> Result<()> {
        let years = dt.year.saturating_sub(2000).min(199) as u8;
        let century = if years >= 100 { MONTH_CENTURY } else { 0 };
        self.write_regs(
            REG_TIME,
            &[
                bcd(dt.second),
                bcd(dt.minute),
                bcd(dt.hour),
                bcd(dt.weekday % 7 + 1),
                bcd(dt.day),
                bcd(dt.month) | century,
                bcd(years % 100),
            ],
        )?;
        self.modify(REG_STATUS, STATUS_OSF, 0)?;
        debug!("DS3231: adjusted to {:?}", dt);
        Ok(())
    }

    fn set_alarm(&mut self, slot: AlarmSlot, dt: &DateTime) -> Result<()> {
        match slot {
            // Daily match on hour:minute:00.
            AlarmSlot::One => self.write_regs(
                REG_ALARM1,
                &[0, bcd(dt.minute), bcd(dt.hour), bcd(dt.day) | ALARM_MASK],
            )?,
            // Match on date, hour and minute.
            AlarmSlot::Two => {
                self.write_regs(REG_ALARM2, &[bcd(dt.minute), bcd(dt.hour), bcd(dt.day)])?
            }
        }
        self.modify(REG_STATUS, slot.flag_bit(), 0)?;
        self.modify(REG_CONTROL, 0, CONTROL_INTCN | slot.enable_bit())
    }

    fn clear_alarm(&mut self, slot: AlarmSlot) -> Result<()> {
        self.modify(REG_CONTROL, slot.enable_bit(), 0)?;
        self.modify(REG_STATUS, slot.flag_bit(), 0)
    }

    fn alarm(&mut self, slot: AlarmSlot) -> Result<Option<DateTime>> {
        let mut control = [0u8];
        self.read_regs(REG_CONTROL, &mut control)?;
        if control[0] & slot.enable_bit() == 0 {
            return Ok(None);
        }
        if slot == AlarmSlot::Two && self.lost_power()? {
            return Ok(None);
        }

        let (minute, hour, day) = match slot {
            AlarmSlot::One => {
                let mut r = [0u8; 4];
                self.read_regs(REG_ALARM1, &mut r)?;
                (r[1], r[2], r[3])
            }
            AlarmSlot::Two => {
                let mut r = [0u8; 3];
                self.read_regs(REG_ALARM2, &mut r)?;
                (r[0], r[1], r[2])
            }
        };
        let now = self.now()?;
        let day = dec(day & 0x3F);
        let (year, month) = if day > now.day {
            match now.month {
                1 => (now.year - 1, 12),
                m => (now.year, m - 1),
            }
        } else {
            (now.year, now.month)
        };
        Ok(Some(DateTime {
            year,
            month,
            day,
            weekday: now.weekday,
            hour: dec(hour & 0x3F),
            minute: dec(minute & 0x7F),
            second: 0,
        }))
    }
}
