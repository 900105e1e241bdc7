//! mk5017 - MK5017 clock-driver emulator firmware for ESP32.
//!
//! Architecture:
//!   - Display refresh: TIMG1 interrupt → `board::scan::scan_task` on a
//!     priority-3 interrupt executor
//!   - Main loop: samples the switch/mains lines and drives `ClockApp`
//!   - Network task: WiFi station, NTP, OTA access point
//!   - Net runner tasks: one embassy-net stack each for station and AP
//!
//! All clock behaviour lives in the `mk5017` library; this file only wires
//! ESP32 peripherals to its collaborator traits.

#![no_std]
#![no_main]

mod board;

use core::net::Ipv4Addr;

use defmt::{error, info, warn};
use defmt_rtt as _;
use esp_backtrace as _;

use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_executor::{SpawnError, SpawnToken, Spawner};
use embassy_net::{Ipv4Cidr, StackResources, StaticConfigV4};
use embassy_time::{Instant, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::ledc::Ledc;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_rtos::embassy::InterruptExecutor;
use esp_storage::FlashStorage;
use static_cell::StaticCell;

use mk5017::config::{
    ClockConfig, DIGIT_SELECT_ACTIVE_LOW, POLL_INTERVAL_US, RTC_I2C_KHZ, SEGMENTS_ACTIVE_LOW,
};
use mk5017::{
    ClockApp, DisplayBuffer, Ds3231, Emulation, Inputs, Request, ScanDriver, ShiftRegisterDriver,
};

use board::clock::SoftClock;
use board::net::{OtaEvent, OTA_EVENTS, REQUESTS};
use board::tone::LedcTone;

esp_bootloader_esp_idf::esp_app_desc!();

/// Segment image shared with the refresh task.
static DISPLAY: DisplayBuffer = DisplayBuffer::new();

/// Runs the display refresh above the thread-mode main loop.
static SCAN_EXECUTOR: StaticCell<InterruptExecutor<2>> = StaticCell::new();

static STA_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
static AP_RESOURCES: StaticCell<StackResources<2>> = StaticCell::new();

fn spawn<S>(spawner: &Spawner, token: Result<SpawnToken<S>, SpawnError>, name: &str) {
    match token {
        Ok(t) => {
            spawner.spawn(t);
        }
        Err(e) => error!("Failed to spawn {}: {:?}", name, e),
    }
}

fn restart() -> ! {
    info!("Restarting");
    esp_hal::system::software_reset()
}

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    info!("mk5017 starting");

    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));

    // esp-radio and jiff need an allocator.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // ── Settings ──────────────────────────────────────────────────────────
    let mut flash = BlockingAsync::new(FlashStorage::new(peripherals.FLASH));
    let image = board::flash::load(&mut flash).await;

    // ── Display refresh ───────────────────────────────────────────────────
    let shift = ShiftRegisterDriver::new(
        Output::new(peripherals.GPIO23, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO18, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO5, Level::Low, OutputConfig::default()),
        Delay::new(),
        DIGIT_SELECT_ACTIVE_LOW,
        SEGMENTS_ACTIVE_LOW,
    );
    let sw_ints = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    let scan_executor = SCAN_EXECUTOR.init(InterruptExecutor::new(sw_ints.software_interrupt2));
    let scan_spawner = scan_executor.start(board::scan::SCAN_PRIORITY);
    match board::scan::scan_task(ScanDriver::new(shift), &DISPLAY) {
        Ok(t) => {
            scan_spawner.spawn(t);
        }
        Err(e) => error!("Failed to spawn scan: {:?}", e),
    }
    let timg1 = TimerGroup::new(peripherals.TIMG1);
    board::scan::start_timer(timg1.timer0);

    // ── Line inputs ───────────────────────────────────────────────────────
    // GPIO34/35 are input-only without internal pulls; the board pulls them down.
    let sense_a = Input::new(peripherals.GPIO34, InputConfig::default());
    let sense_b = Input::new(peripherals.GPIO35, InputConfig::default());
    let hold = Input::new(
        peripherals.GPIO32,
        InputConfig::default().with_pull(Pull::Up),
    );
    let mains = Input::new(peripherals.GPIO33, InputConfig::default());

    // ── Collaborators ─────────────────────────────────────────────────────
    let rtc = match I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(RTC_I2C_KHZ)),
    ) {
        Ok(bus) => Ds3231::new(
            bus.with_sda(peripherals.GPIO21)
                .with_scl(peripherals.GPIO22),
        ),
        Err(e) => {
            error!("I2C init failed: {:?}", e);
            restart();
        }
    };
    let tone = LedcTone::new(Ledc::new(peripherals.LEDC), peripherals.GPIO25);

    // No capacitive pad on this board; the switch pair stands in for it.
    let config = ClockConfig {
        switch_touch: true,
        ..ClockConfig::default()
    };

    let mut app = ClockApp::new(
        &DISPLAY,
        SoftClock::new(),
        rtc,
        image,
        tone,
        config,
        Instant::now().as_micros(),
    );
    let station = app.persisted().info.emulation == Emulation::Network;

    // ── Networking ────────────────────────────────────────────────────────
    match esp_radio::init() {
        Ok(radio) => {
            static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
            let radio = RADIO.init(radio);
            match esp_radio::wifi::new(radio, peripherals.WIFI, Default::default()) {
                Ok((mut wifi, interfaces)) => {
                    if let Err(e) = wifi.set_config(&board::net::client_mode()) {
                        warn!("WiFi: station config rejected: {:?}", e);
                    }
                    let seed = Instant::now().as_ticks() ^ 0x6d6b_3530_3137_0000;
                    let (sta, sta_runner) = embassy_net::new(
                        interfaces.sta,
                        embassy_net::Config::dhcpv4(Default::default()),
                        STA_RESOURCES.init(StackResources::new()),
                        seed,
                    );
                    let (ap, ap_runner) = embassy_net::new(
                        interfaces.ap,
                        embassy_net::Config::ipv4_static(StaticConfigV4 {
                            address: Ipv4Cidr::new(Ipv4Addr::new(192, 168, 4, 1), 24),
                            gateway: None,
                            dns_servers: Default::default(),
                        }),
                        AP_RESOURCES.init(StackResources::new()),
                        seed.rotate_left(17),
                    );
                    spawn(&spawner, board::net::net_task(sta_runner), "sta runner");
                    spawn(&spawner, board::net::net_task(ap_runner), "ap runner");
                    spawn(
                        &spawner,
                        board::net::network_task(wifi, sta, ap, station),
                        "network",
                    );
                }
                Err(e) => error!("WiFi init failed: {:?}", e),
            }
        }
        Err(e) => error!("Radio init failed: {:?}", e),
    }

    info!("Entering main loop");

    // ── Main loop ─────────────────────────────────────────────────────────
    loop {
        let now_us = Instant::now().as_micros();

        while let Ok(event) = OTA_EVENTS.try_receive() {
            match event {
                OtaEvent::Activity => app.ota_activity(now_us),
                OtaEvent::Finished(requested) => {
                    if let Some(Request::Restart) = app.finish_ota(requested, now_us) {
                        board::flash::flush(&mut flash, app.store_mut()).await;
                        restart();
                    }
                }
            }
        }

        let inputs = Inputs {
            scan: DISPLAY
                .sample_phase(|| (sense_a.is_high(), sense_b.is_high()))
                .map(|(phase, (a, b))| (phase, a, b)),
            hold: hold.is_low(),
            mains: mains.is_high(),
            touch_raw: None,
        };

        match app.poll(now_us, &inputs) {
            Some(Request::Restart) => {
                board::flash::flush(&mut flash, app.store_mut()).await;
                // Let the "please wait" frame reach the display.
                Timer::after_millis(100).await;
                restart();
            }
            Some(request) => {
                if REQUESTS.try_send(request).is_err() {
                    warn!("Network request queue full, dropping {:?}", request);
                }
            }
            None => {}
        }

        if app.store_mut().needs_flush() {
            board::flash::flush(&mut flash, app.store_mut()).await;
        }

        Timer::after_micros(POLL_INTERVAL_US).await;
    }
}
