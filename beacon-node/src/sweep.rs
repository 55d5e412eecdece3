//! C5 — Channel Sweep Scheduler. The beacon's top-level state machine:
//! `INIT → SCAN → (per channel) { DWELL_FLOOR, RANGE_ALL } → SELECT → SEND → SLEEP`.

use std::collections::BTreeSet;
use std::time::Duration;

use ftm_types::{AnchorObservation, FloorReport, GatewayRecord};
use hw_sim::{EspNowTransport, FtmDriver, WifiScanner};
use tracing::info;

use crate::config::BeaconConfig;
use crate::floor_listener;
use crate::ranger;

/// Everything the sweep produced this wake cycle, ready to hand to the
/// reporter (C6).
pub struct SweepOutcome {
    pub observations: Vec<AnchorObservation>,
    pub floor: i8,
    /// Gateways that replied during the scan, for C6's candidate selection.
    pub gateways: Vec<GatewayRecord>,
}

/// Run one full wake cycle: scan, sweep every discovered channel, and select
/// the top-K anchors by ascending variance (spec §4.4).
pub async fn run_sweep<S, F, T>(
    scanner: &mut S,
    ftm: &mut F,
    transport: &mut T,
    cfg: &BeaconConfig,
) -> SweepOutcome
where
    S: WifiScanner,
    F: FtmDriver,
    T: EspNowTransport,
{
    // Scanner already filters to SSID "Gateway_Network" (spec §4.4 step 1).
    let gateway_list: Vec<GatewayRecord> = scanner.scan().await;

    if gateway_list.is_empty() {
        info!("sweep: no gateways heard, nothing to range");
        return SweepOutcome { observations: Vec::new(), floor: 0, gateways: Vec::new() };
    }

    let unique_channels: BTreeSet<u8> = gateway_list.iter().map(|g| g.channel).collect();

    let mut final_observations = Vec::new();
    let mut all_floor_reports: Vec<FloorReport> = Vec::new();

    for &ch in &unique_channels {
        transport.set_channel(ch).await;
        tokio::time::sleep(Duration::from_millis(cfg.channel_switch_settle_ms)).await;

        let floor_reports = floor_listener::dwell_floor(transport, ch, cfg.floor_dwell_ms).await;
        all_floor_reports.extend(floor_reports);

        for gw in gateway_list.iter().filter(|g| g.channel == ch) {
            if let Some(obs) = ranger::range_anchor(ftm, gw.mac, gw.rssi_dbm, cfg).await {
                final_observations.push(obs);
            }
        }
    }

    final_observations.sort_by(|a, b| a.variance_m2.partial_cmp(&b.variance_m2).unwrap());
    final_observations.truncate(cfg.top_k_anchors.min(final_observations.len()));

    let floor = floor_listener::floor_mode(&all_floor_reports);

    SweepOutcome { observations: final_observations, floor, gateways: gateway_list }
}
