//! WiFi, NTP and the OTA access point.
//!
//! One task owns the WiFi controller. It keeps the station connected (in
//! network mode), runs an NTP exchange every [`NTP_INTERVAL_SECS`] and
//! carries out the app's networking [`Request`]s, which arrive over
//! [`REQUESTS`]. OTA traffic is reported back over [`OTA_EVENTS`].
//!
//! The update listener only tracks liveness and a couple of control words;
//! image transfer is out of scope.

use core::net::{IpAddr, SocketAddr};

use defmt::{debug, error, info, warn};
use embassy_futures::select::{select, Either};
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{Runner, Stack};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{with_timeout, Duration, Instant, Timer};
use esp_radio::wifi::{
    AccessPointConfig, AuthMethod, ClientConfig, ModeConfig, WifiController, WifiDevice,
};
use mk5017::config::{
    NTP_INTERVAL_SECS, NTP_SERVER, NTP_TIMEOUT_SECS, OTA_AP_PASSWORD, OTA_AP_SSID, OTA_PORT,
    WIFI_CONNECT_TIMEOUT_SECS, WIFI_PASSWORD, WIFI_SSID,
};
use mk5017::{Emulation, Error, Request, Result};
use sntpc::{NtpContext, NtpTimestampGenerator};

use super::clock;

const NTP_PORT: u16 = 123;

/// Networking work handed over by the main loop.
pub static REQUESTS: Channel<CriticalSectionRawMutex, Request, 4> = Channel::new();

/// What the update listener saw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum OtaEvent {
    Activity,
    /// The portal closed the session, optionally asking for another emulation.
    Finished(Option<Emulation>),
}

pub static OTA_EVENTS: Channel<CriticalSectionRawMutex, OtaEvent, 4> = Channel::new();

#[embassy_executor::task(pool_size = 2)]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

/// sntpc timestamp source over the embassy clock.
#[derive(Clone, Copy, Default)]
struct Timestamps {
    start: Option<Instant>,
}

impl NtpTimestampGenerator for Timestamps {
    fn init(&mut self) {
        self.start = Some(Instant::now());
    }

    fn timestamp_sec(&self) -> u64 {
        self.start.map_or(0, |s| s.elapsed().as_secs())
    }

    fn timestamp_subsec_micros(&self) -> u32 {
        self.start
            .map_or(0, |s| (s.elapsed().as_micros() % 1_000_000) as u32)
    }
}

/// One NTP exchange. Returns UTC µs since the Unix epoch.
async fn ntp_exchange(stack: Stack<'_>) -> Result<i64> {
    let addrs = stack
        .dns_query(NTP_SERVER, DnsQueryType::A)
        .await
        .map_err(|e| {
            warn!("NTP: DNS lookup failed: {:?}", e);
            Error::TimeSource
        })?;
    let addr: IpAddr = addrs.first().copied().ok_or(Error::TimeSource)?.into();

    let mut rx_meta = [PacketMetadata::EMPTY; 4];
    let mut rx_buffer = [0u8; 256];
    let mut tx_meta = [PacketMetadata::EMPTY; 4];
    let mut tx_buffer = [0u8; 256];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    socket.bind(0).map_err(|_| Error::TimeSource)?;

    let result = with_timeout(
        Duration::from_secs(NTP_TIMEOUT_SECS),
        sntpc::get_time(
            SocketAddr::new(addr, NTP_PORT),
            &socket,
            NtpContext::new(Timestamps::default()),
        ),
    )
    .await
    .map_err(|_| Error::Timeout)?
    .map_err(|e| {
        warn!("NTP: exchange failed: {:?}", defmt::Debug2Format(&e));
        Error::TimeSource
    })?;

    let frac_us = u64::from(result.sec_fraction()) * 1_000_000 / u64::from(u32::MAX);
    Ok(result.sec() as i64 * 1_000_000 + frac_us as i64)
}

async fn sync(stack: Stack<'_>) {
    match ntp_exchange(stack).await {
        Ok(us) => clock::apply_ntp(us),
        Err(e) => warn!("NTP: sync failed: {:?}", e),
    }
}

pub fn client_mode() -> ModeConfig {
    ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(WIFI_SSID.into())
            .with_password(WIFI_PASSWORD.into()),
    )
}

fn ota_mode() -> ModeConfig {
    ModeConfig::AccessPoint(
        AccessPointConfig::default()
            .with_ssid(OTA_AP_SSID.into())
            .with_password(OTA_AP_PASSWORD.into())
            .with_auth_method(AuthMethod::Wpa2Personal),
    )
}

/// Associate and wait for DHCP within [`WIFI_CONNECT_TIMEOUT_SECS`].
async fn connect(wifi: &mut WifiController<'static>, stack: Stack<'_>) -> Result<()> {
    if stack.is_config_up() && matches!(wifi.is_connected(), Ok(true)) {
        return Ok(());
    }
    let attempt = async {
        if !wifi.is_started().unwrap_or(false) {
            wifi.start_async().await.map_err(|e| {
                warn!("WiFi: start failed: {:?}", e);
                Error::Timeout
            })?;
        }
        wifi.connect_async().await.map_err(|e| {
            warn!("WiFi: connect failed: {:?}", e);
            Error::Timeout
        })?;
        stack.wait_config_up().await;
        Ok(())
    };
    let outcome = with_timeout(Duration::from_secs(WIFI_CONNECT_TIMEOUT_SECS), attempt).await;
    match outcome {
        Ok(Ok(())) => {
            info!("WiFi: connected");
            Ok(())
        }
        Ok(Err(e)) => Err(e),
        Err(_) => {
            warn!("WiFi: no DHCP lease within {} s", WIFI_CONNECT_TIMEOUT_SECS);
            let _ = wifi.disconnect_async().await;
            Err(Error::Timeout)
        }
    }
}

async fn switch_mode(wifi: &mut WifiController<'static>, mode: &ModeConfig) -> Result<()> {
    if matches!(wifi.is_started(), Ok(true)) {
        let _ = wifi.stop_async().await;
    }
    wifi.set_config(mode).map_err(|e| {
        error!("WiFi: mode change failed: {:?}", e);
        Error::Timeout
    })?;
    wifi.start_async().await.map_err(|e| {
        error!("WiFi: restart failed: {:?}", e);
        Error::Timeout
    })
}

/// Interpret one datagram from the update client.
fn ota_control(payload: &[u8]) -> Option<OtaEvent> {
    match payload {
        b"done" => Some(OtaEvent::Finished(None)),
        b"emu=0" => Some(OtaEvent::Finished(Some(Emulation::Network))),
        b"emu=1" => Some(OtaEvent::Finished(Some(Emulation::HardwareFaithful))),
        _ => None,
    }
}

/// Serve the update access point until the app asks to leave.
async fn ota_session(wifi: &mut WifiController<'static>, ap: Stack<'_>, station: bool) {
    if let Err(e) = switch_mode(wifi, &ota_mode()).await {
        warn!("OTA: access point failed: {:?}", e);
        let _ = OTA_EVENTS.try_send(OtaEvent::Finished(None));
        return;
    }
    info!("OTA: access point '{}' up", OTA_AP_SSID);

    let mut rx_meta = [PacketMetadata::EMPTY; 4];
    let mut rx_buffer = [0u8; 512];
    let mut tx_meta = [PacketMetadata::EMPTY; 1];
    let mut tx_buffer = [0u8; 64];
    let mut socket = UdpSocket::new(
        ap,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    if socket.bind(OTA_PORT).is_err() {
        error!("OTA: bind {} failed", OTA_PORT);
    }

    let mut buf = [0u8; 64];
    loop {
        match select(REQUESTS.receive(), socket.recv_from(&mut buf)).await {
            Either::First(Request::ExitOta) => break,
            Either::First(other) => debug!("OTA: ignoring {:?}", other),
            Either::Second(Ok((n, _))) => {
                let event = ota_control(&buf[..n]).unwrap_or(OtaEvent::Activity);
                if OTA_EVENTS.try_send(event).is_err() {
                    warn!("OTA: event queue full");
                }
                if matches!(event, OtaEvent::Finished(_)) {
                    break;
                }
            }
            Either::Second(Err(e)) => debug!("OTA: recv error {:?}", e),
        }
    }

    drop(socket);
    info!("OTA: closing access point");
    if !station {
        let _ = wifi.stop_async().await;
    } else if let Err(e) = switch_mode(wifi, &client_mode()).await {
        warn!("OTA: station restore failed: {:?}", e);
    }
}

/// Owns the WiFi controller. `station` is false in hardware-faithful mode,
/// where the radio is only used for OTA.
#[embassy_executor::task]
pub async fn network_task(
    mut wifi: WifiController<'static>,
    sta: Stack<'static>,
    ap: Stack<'static>,
    station: bool,
) -> ! {
    info!("Network task started (station = {})", station);
    let mut next_sync = Instant::now();

    loop {
        if station && connect(&mut wifi, sta).await.is_err() {
            // The app's sync supervisor escalates if this keeps failing.
            next_sync = Instant::now() + Duration::from_secs(WIFI_CONNECT_TIMEOUT_SECS);
        }

        let deadline = if station {
            next_sync
        } else {
            Instant::MAX
        };
        match select(REQUESTS.receive(), Timer::at(deadline)).await {
            Either::First(Request::Resync) | Either::Second(()) => {
                if station {
                    sync(sta).await;
                }
                next_sync = Instant::now() + Duration::from_secs(NTP_INTERVAL_SECS);
            }
            Either::First(Request::ResetNetwork) => {
                info!("Network: reset");
                let _ = wifi.disconnect_async().await;
                let _ = wifi.stop_async().await;
                next_sync = Instant::now();
            }
            Either::First(Request::EnterOta) => ota_session(&mut wifi, ap, station).await,
            Either::First(request) => debug!("Network: ignoring {:?}", request),
        }
    }
}
