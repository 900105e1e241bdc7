//! End-to-end scenarios for the host-testable clock stack.
//!
//! The controller runs against the real DS3231 driver (over a register-file
//! I2C fake that survives "power cycles"), the RAM settings image and the
//! display scan core. Only the time source and the tone are stand-ins.

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
use mk5017::config::{ClockConfig, DATE_DISPLAY_SECS};
use mk5017::display::{DisplayMode, Message};
use mk5017::editor::EditTarget;
use mk5017::switches::{SwitchId, SCAN_TABLE};
use mk5017::time::SECONDS_PER_DAY;
use mk5017::{
    AlarmSlot, BackupClock, ByteImage, ClockApp, DateTime, DigitDriver, DisplayBuffer, Ds3231,
    Emulation, Inputs, Model, Request, Result, ScanDriver, TimeSource, ToneOutput, Waveform,
};

// ═══════════════════════════════════════════════════════════════════════════
// Collaborators
// ═══════════════════════════════════════════════════════════════════════════

/// DS3231 register file shared by every bus handle.
#[derive(Clone, Default)]
struct SharedBus {
    regs: Rc<RefCell<[u8; 0x13]>>,
    ptr: usize,
}

impl ErrorType for SharedBus {
    type Error = ErrorKind;
}

impl I2c for SharedBus {
    fn transaction(
        &mut self,
        _address: u8,
        ops: &mut [Operation<'_>],
    ) -> core::result::Result<(), ErrorKind> {
        let mut regs = self.regs.borrow_mut();
        for op in ops {
            match op {
                Operation::Write(bytes) => {
                    if let Some((&reg, data)) = bytes.split_first() {
                        self.ptr = reg as usize;
                        for b in data {
                            regs[self.ptr] = *b;
                            self.ptr += 1;
                        }
                    }
                }
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        *b = regs[self.ptr];
                        self.ptr += 1;
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct ManualClock {
    now: DateTime,
}

impl TimeSource for ManualClock {
    fn now(&mut self) -> Result<DateTime> {
        Ok(self.now)
    }

    fn set(&mut self, dt: &DateTime) -> Result<()> {
        self.now = *dt;
        Ok(())
    }

    fn is_stale(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct SilentTone;

impl ToneOutput for SilentTone {
    fn load(&mut self, _waveform: &Waveform) -> Result<()> {
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Logs `(select_mask, segments)` pairs into a shared vector.
struct RecordingDigits(Rc<RefCell<Vec<(u8, u8)>>>);

impl DigitDriver for RecordingDigits {
    fn write(&mut self, select_mask: u8, segments: u8) -> Result<()> {
        self.0.borrow_mut().push((select_mask, segments));
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Device
// ═══════════════════════════════════════════════════════════════════════════

type App = ClockApp<'static, ManualClock, Ds3231<SharedBus>, ByteImage, SilentTone>;

/// One powered-up clock: settings bytes and the RTC bus outlive it.
struct Device {
    app: App,
    display: &'static DisplayBuffer,
    bus: SharedBus,
    now_us: u64,
    phase: usize,
    held: Vec<SwitchId>,
    mains: bool,
    requests: Vec<Request>,
}

fn at(hour: u8, minute: u8, second: u8) -> DateTime {
    DateTime {
        year: 2024,
        month: 3,
        day: 14,
        weekday: 4,
        hour,
        minute,
        second,
    }
}

impl Device {
    fn power_on(settings: [u8; 3], bus: SharedBus) -> Self {
        Self::power_on_holding(settings, bus, &[])
    }

    /// Boot with `held` pressed through the settle window.
    fn power_on_holding(settings: [u8; 3], bus: SharedBus, held: &[SwitchId]) -> Self {
        let display: &'static DisplayBuffer = Box::leak(Box::new(DisplayBuffer::new()));
        let app = ClockApp::new(
            display,
            ManualClock::default(),
            Ds3231::new(bus.clone()),
            ByteImage::from_bytes(&settings),
            SilentTone,
            ClockConfig::default(),
            0,
        );
        let mut dev = Self {
            app,
            display,
            bus,
            now_us: 0,
            phase: 0,
            held: held.to_vec(),
            mains: false,
            requests: Vec::new(),
        };
        dev.run_ms(60);
        dev
    }

    /// Restart with whatever was persisted.
    fn power_cycle(self) -> Self {
        let settings = *self.app.store().bytes();
        Self::power_on(settings, self.bus)
    }

    fn step(&mut self) {
        let map = SCAN_TABLE[self.phase];
        let held = |id: Option<SwitchId>| id.is_some_and(|id| self.held.contains(&id));
        self.mains = !self.mains;
        let inputs = Inputs {
            scan: Some((self.phase, held(map.line_a), held(map.line_b))),
            hold: self.held.contains(&SwitchId::Hold),
            mains: self.mains,
            touch_raw: None,
        };
        if let Some(req) = self.app.poll(self.now_us, &inputs) {
            self.requests.push(req);
        }
        self.phase = (self.phase + 1) % SCAN_TABLE.len();
        self.now_us += 2_000;
    }

    fn run_ms(&mut self, ms: u64) {
        for _ in 0..ms / 2 {
            self.step();
        }
    }

    fn press(&mut self, ids: &[SwitchId]) {
        self.held = ids.to_vec();
        self.run_ms(40);
    }

    fn release(&mut self) {
        self.press(&[]);
    }

    fn next_second(&mut self) {
        let clock = &mut self.app.time_source_mut().now;
        let sod = (clock.seconds_of_day() + 1) % SECONDS_PER_DAY;
        *clock = clock.with_time((sod / 3_600) as u8, (sod / 60 % 60) as u8, (sod % 60) as u8);
    }

    fn tick(&mut self) {
        self.next_second();
        self.run_ms(1_000);
    }

    /// One editor increment with `extra` held on top of `base`.
    fn bump(&mut self, base: &[SwitchId], extra: &[SwitchId]) {
        let mut ids = base.to_vec();
        ids.extend_from_slice(extra);
        self.press(&ids);
        self.next_second();
        self.run_ms(40);
        self.press(base);
        self.run_ms(600);
    }
}

/// Bus whose RTC holds `now` with a matching validity marker.
fn rtc_at(now: DateTime) -> SharedBus {
    let bus = SharedBus::default();
    let mut rtc = Ds3231::new(bus.clone());
    rtc.adjust(&now).unwrap();
    rtc.set_alarm(AlarmSlot::Two, &now).unwrap();
    bus
}

// ═══════════════════════════════════════════════════════════════════════════
// Scenarios
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn hardware_boot_follows_trusted_rtc() {
    let mut dev = Device::power_on([1, 0, 0], rtc_at(at(9, 41, 7)));
    assert!(dev.app.backup_trusted());
    assert!(!dev.app.editor().is_editing());
    assert_eq!(dev.app.time_source().now.minute_of_day(), 9 * 60 + 41);
    assert_eq!(dev.app.display_mode(), DisplayMode::Time);
    assert_ne!(dev.display.snapshot(), Message::Blank.segments());
}

#[test]
fn scan_core_pushes_the_rendered_frame() {
    let dev = Device::power_on([0, 0, 0], rtc_at(at(21, 15, 0)));
    let frame = dev.display.snapshot();

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut scan = ScanDriver::new(RecordingDigits(log.clone()));
    for i in 0..frame.len() {
        assert_eq!(scan.step(dev.display).unwrap() as usize, i);
        assert_eq!(dev.display.phase() as usize, i);
    }

    let expected: Vec<(u8, u8)> = frame
        .iter()
        .enumerate()
        .map(|(i, &seg)| (1 << i, seg))
        .collect();
    assert_eq!(*log.borrow(), expected);
}

#[test]
fn corrupt_settings_boot_network_defaults() {
    let dev = Device::power_on([99, 99, 0], SharedBus::default());
    let info = dev.app.persisted().info;
    assert_eq!(info.emulation, Emulation::Network);
    assert_eq!(info.model, Model::A);
    assert!(!dev.app.editor().is_editing());
    assert!(dev.requests.is_empty());
}

#[test]
fn model_choice_survives_restart() {
    let mut dev = Device::power_on([1, 4, 0], SharedBus::default());
    assert_eq!(dev.app.editor().target(), Some(EditTarget::Model));

    dev.bump(&[], &[SwitchId::HourMonth]);
    dev.press(&[SwitchId::TimeSet]);
    dev.release();
    assert_eq!(dev.display.snapshot(), Message::Done.segments());
    dev.run_ms(2_100);
    assert!(dev.requests.contains(&Request::Restart));

    let dev = dev.power_cycle();
    assert_eq!(dev.app.persisted().info.model, Model::B);
    // A fresh model needs the time entered again.
    assert_eq!(dev.app.editor().target(), Some(EditTarget::Time));
}

#[test]
fn time_entered_after_power_loss_is_kept_by_the_rtc() {
    let mut dev = Device::power_on([1, 0, 0], SharedBus::default());
    assert_eq!(dev.app.editor().target(), Some(EditTarget::Time));

    for _ in 0..5 {
        dev.bump(&[], &[SwitchId::HourMonth]);
    }
    dev.press(&[SwitchId::TimeSet]);
    dev.release();
    assert!(!dev.app.editor().is_editing());

    let mut dev = dev.power_cycle();
    assert!(dev.app.backup_trusted());
    assert!(!dev.app.editor().is_editing());
    assert_eq!(dev.app.time_source().now.hour, 5);
}

#[test]
fn alarm_setting_lives_in_rtc_slot_one() {
    let mut dev = Device::power_on([1, 0, 0], rtc_at(at(6, 30, 0)));
    dev.press(&[SwitchId::AlarmDate]);
    assert_eq!(dev.app.editor().target(), Some(EditTarget::Alarm));
    for _ in 0..7 {
        dev.bump(&[SwitchId::AlarmDate], &[SwitchId::HourMonth]);
    }
    dev.release();
    assert_eq!(dev.app.alarm().stored(), Some((7, 0)));

    let mut rtc = Ds3231::new(dev.bus.clone());
    let slot = rtc.alarm(AlarmSlot::One).unwrap().unwrap();
    assert_eq!((slot.hour, slot.minute), (7, 0));

    let dev = dev.power_cycle();
    assert_eq!(dev.app.alarm().stored(), Some((7, 0)));
}

#[test]
fn calendar_model_date_display_times_out() {
    let mut dev = Device::power_on([1, 3, 0], rtc_at(at(9, 0, 1)));
    dev.press(&[SwitchId::SnoozeDate]);
    dev.release();
    assert_eq!(dev.app.display_mode(), DisplayMode::Date);

    for _ in 0..DATE_DISPLAY_SECS {
        dev.tick();
    }
    assert_eq!(dev.app.display_mode(), DisplayMode::Time);
}

#[test]
fn emulation_toggle_gesture_persists_and_restarts() {
    let mut dev =
        Device::power_on_holding([0, 0, 0], rtc_at(at(12, 0, 0)), &[SwitchId::HourMonth]);
    assert_eq!(dev.requests, [Request::Restart]);
    assert_eq!(dev.display.snapshot(), Message::Wait.segments());

    dev.held.clear();
    let mut dev = dev.power_cycle();
    assert_eq!(dev.app.persisted().info.emulation, Emulation::HardwareFaithful);
    assert!(dev.app.backup_trusted());
    assert!(dev.requests.is_empty());
}
