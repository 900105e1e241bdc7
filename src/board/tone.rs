//! Alarm tone on an LEDC channel.
//!
//! The LEDC produces a continuous square wave, so only the waveform's
//! frequency is used; bursts are gated by the alarm engine's play/stop.

use esp_hal::gpio::DriveMode;
use esp_hal::ledc::channel::{self, ChannelIFace};
use esp_hal::ledc::timer::{self, LSClockSource, TimerIFace};
use esp_hal::ledc::{LSGlobalClkSource, Ledc, LowSpeed};
use esp_hal::peripherals::GPIO25;
use esp_hal::time::Rate;
use mk5017::{Error, Result, ToneOutput, Waveform};

pub struct LedcTone {
    ledc: Ledc<'static>,
    pin: GPIO25<'static>,
    freq_hz: u32,
}

impl LedcTone {
    pub fn new(mut ledc: Ledc<'static>, pin: GPIO25<'static>) -> Self {
        ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);
        Self {
            ledc,
            pin,
            freq_hz: 0,
        }
    }

    fn drive(&mut self, duty_pct: u8) -> Result<()> {
        if self.freq_hz == 0 {
            return Err(Error::Tone);
        }
        let mut timer = self.ledc.timer::<LowSpeed>(timer::Number::Timer0);
        timer
            .configure(timer::config::Config {
                duty: timer::config::Duty::Duty10Bit,
                clock_source: LSClockSource::APBClk,
                frequency: Rate::from_hz(self.freq_hz),
            })
            .map_err(|_| Error::Tone)?;

        let mut ch = self
            .ledc
            .channel(channel::Number::Channel0, self.pin.reborrow());
        ch.configure(channel::config::Config {
            timer: &timer,
            duty_pct,
            drive_mode: DriveMode::PushPull,
        })
        .map_err(|_| Error::Tone)
    }
}

impl ToneOutput for LedcTone {
    fn load(&mut self, waveform: &Waveform) -> Result<()> {
        self.freq_hz = waveform.frequency_hz();
        defmt::debug!("Tone: {} Hz", self.freq_hz);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.drive(50)
    }

    fn stop(&mut self) -> Result<()> {
        self.drive(0)
    }
}
