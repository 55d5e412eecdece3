//! # hw-sim
//!
//! Simulated implementations of the radio-driver interfaces the beacon and
//! gateway binaries depend on. Real Wi-Fi FTM, ESP-NOW, and NVS are out of
//! scope (spec §1) — this crate is the one implementation that is actually
//! shipped, not a test-only mock, matching a "software stands in for
//! not-yet-integrated hardware" stance.

mod espnow;
mod radio;
mod traits;

pub use espnow::{AddressBook, UdpEspNow};
pub use radio::{RadioConfig, SimFtmDriver, SimWifiScanner, SimWorld, SPEED_OF_LIGHT_MPS};
pub use traits::{EspNowTransport, FtmDriver, FtmError, WifiScanner};
