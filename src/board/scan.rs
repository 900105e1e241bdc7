//! Display refresh.
//!
//! A TIMG1 periodic interrupt fires every [`SCAN_INTERVAL_US`] and wakes
//! [`scan_task`] through a single-slot signal. The task does nothing but
//! step the scan driver. It runs on an interrupt executor at
//! [`SCAN_PRIORITY`], so blocking flash and I2C work in the thread-mode main
//! loop cannot stall the multiplex.

use core::cell::RefCell;

use defmt::{info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use esp_hal::delay::Delay;
use esp_hal::gpio::Output;
use esp_hal::handler;
use esp_hal::interrupt::Priority;
use esp_hal::time::Duration;
use esp_hal::timer::{PeriodicTimer, Timer};
use esp_hal::Blocking;
use mk5017::config::SCAN_INTERVAL_US;
use mk5017::{DisplayBuffer, ScanDriver, ShiftRegisterDriver};

pub type Shift = ShiftRegisterDriver<Output<'static>, Output<'static>, Output<'static>, Delay>;

/// Shared by the timer interrupt and the executor that runs [`scan_task`].
pub const SCAN_PRIORITY: Priority = Priority::Priority3;

static SCAN_WAKE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

static SCAN_TIMER: Mutex<CriticalSectionRawMutex, RefCell<Option<PeriodicTimer<'static, Blocking>>>> =
    Mutex::new(RefCell::new(None));

#[handler(priority = Priority::Priority3)]
fn scan_tick() {
    SCAN_TIMER.lock(|t| {
        if let Some(timer) = t.borrow_mut().as_mut() {
            timer.clear_interrupt();
        }
    });
    SCAN_WAKE.signal(());
}

/// Arm the periodic refresh interrupt.
pub fn start_timer(timer: impl Timer + 'static) {
    let mut periodic = PeriodicTimer::new(timer);
    periodic.set_interrupt_handler(scan_tick);
    periodic.listen();
    if let Err(e) = periodic.start(Duration::from_micros(SCAN_INTERVAL_US)) {
        warn!("Scan: timer start failed: {:?}", e);
        return;
    }
    SCAN_TIMER.lock(|t| t.replace(Some(periodic)));
    info!("Scan: {} µs per digit", SCAN_INTERVAL_US);
}

#[embassy_executor::task]
pub async fn scan_task(mut scan: ScanDriver<Shift>, buffer: &'static DisplayBuffer) -> ! {
    loop {
        SCAN_WAKE.wait().await;
        if let Err(e) = scan.step(buffer) {
            warn!("Scan: output failed: {:?}", e);
        }
    }
}
