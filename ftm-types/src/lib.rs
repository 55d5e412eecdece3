//! # ftm-types
//!
//! Shared wire and domain types for the FTM indoor positioning network.
//!
//! These types are used by:
//! - `beacon-node`: building and transmitting `BeaconSummary` packets
//! - `gateway-hub`: parsing inbound summaries, running the Kalman smoother,
//!   and serializing the relayed JSON body
//! - `hw-sim`: producing realistic scan results and FTM samples for both
//!
//! ## Invariants (see spec §3, §8)
//! - `AnchorObservation::distance_m` is always in `[0.15, 50.0]`.
//! - `BeaconSummary` measurement slots are packed from index 0; an empty
//!   slot never precedes a non-empty one.
//! - Wire encoding is a fixed 200-byte layout (§6); any other length is
//!   rejected, never partially parsed.

mod mac;
mod wire;

pub use mac::MacAddr;
pub use wire::{WireError, BEACON_SUMMARY_WIRE_LEN, MAX_MEASUREMENTS};

use serde::{Deserialize, Serialize};

// ── Scan & floor discovery ───────────────────────────────────────────────────

/// One AP seen during the beacon's channel scan (§3 `GatewayRecord`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GatewayRecord {
    pub mac: MacAddr,
    /// Wi-Fi channel, 1..=13.
    pub channel: u8,
    pub rssi_dbm: i8,
}

/// One floor broadcast overheard during a channel dwell (§3 `FloorReport`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloorReport {
    pub gateway_mac: MacAddr,
    /// Full signed range as broadcast; floor-mode calculation bins -99..=99.
    pub floor: i8,
    pub rssi_dbm: i8,
    pub channel: u8,
}

// ── Ranging result ────────────────────────────────────────────────────────────

/// Result of ranging against one anchor, post-calibration (§3 `AnchorObservation`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorObservation {
    pub anchor_id: MacAddr,
    pub distance_m: f32,
    pub variance_m2: f32,
    pub rssi_dbm: i8,
    pub sample_count: u8,
    pub rtt_ns: u32,
}

impl AnchorObservation {
    pub const MIN_DISTANCE_M: f32 = 0.15;
    pub const MAX_DISTANCE_M: f32 = 50.0;

    /// Whether this observation satisfies the invariants in spec §3/§8.
    pub fn is_valid(&self) -> bool {
        self.distance_m >= Self::MIN_DISTANCE_M
            && self.distance_m <= Self::MAX_DISTANCE_M
            && self.variance_m2 >= 0.0
            && self.sample_count >= 1
    }
}

pub use wire::{BeaconSummary, MeasurementSlot};
