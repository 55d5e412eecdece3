use std::time::Duration;

use ftm_types::{GatewayRecord, MacAddr};

/// Why an FTM ranging attempt produced no samples (spec §7).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FtmError {
    /// Driver returned "unsupported" synchronously — triggers the RSSI
    /// fallback path in the ranger, single shot, no retry.
    #[error("FTM not supported for this anchor")]
    Unsupported,
    /// Wait timeout elapsed (6 s) with no report delivered.
    #[error("FTM session timed out")]
    Timeout,
}

/// Active Wi-Fi scan across all channels, already filtered to APs advertising
/// SSID `"Gateway_Network"` (spec §4.4 step 1).
pub trait WifiScanner {
    async fn scan(&mut self) -> Vec<GatewayRecord>;
}

/// One FTM burst session against a single anchor on the radio's current
/// primary channel (spec §4.2).
pub trait FtmDriver {
    /// Returns raw per-sample RTTs in picoseconds.
    async fn measure(&mut self, anchor: MacAddr) -> Result<Vec<i64>, FtmError>;
}

/// Layer-2 unicast/broadcast transport standing in for ESP-NOW.
pub trait EspNowTransport {
    async fn set_channel(&mut self, channel: u8);
    /// Register `mac` as a unicast peer on the current channel.
    /// Returns `false` if the peer could not be added (spec §7 "Peer add fails").
    async fn add_peer(&mut self, mac: MacAddr) -> bool;
    /// Send one payload to `mac`; returns whether a send-completion ack arrived.
    async fn send(&mut self, mac: MacAddr, payload: &[u8]) -> bool;
    /// Wait up to `timeout` for one inbound frame, broadcast or unicast.
    /// Returns `(src, payload, rssi_dbm)` — real ESP-NOW delivers an RSSI
    /// alongside every received frame.
    async fn recv(&mut self, timeout: Duration) -> Option<(MacAddr, Vec<u8>, i8)>;
    /// Broadcast one payload to every peer on the current channel.
    async fn broadcast(&mut self, payload: &[u8]) -> bool;
}
