//! ESP32 implementations of the library's collaborator traits.
//!
//! - [`clock`]: NTP-disciplined software clock (`TimeSource`)
//! - [`flash`]: settings image persisted with `sequential-storage`
//! - [`tone`]: LEDC square-wave output (`ToneOutput`)
//! - [`scan`]: timer interrupt + display refresh task
//! - [`net`]: WiFi station, NTP exchanges and the OTA access point

pub mod clock;
pub mod flash;
pub mod net;
pub mod scan;
pub mod tone;
