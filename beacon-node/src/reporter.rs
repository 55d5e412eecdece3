//! C6 — Beacon Reporter. Selects the transmit path and delivers the summary
//! with retry + gateway failover (spec §4.6).

use std::time::Duration;

use ftm_types::{BeaconSummary, MeasurementSlot};
use hw_sim::EspNowTransport;
use tracing::{info, warn};

use crate::config::BeaconConfig;
use crate::sweep::SweepOutcome;

/// Build, then attempt to deliver, the summary for this wake cycle. Returns
/// whether delivery was acknowledged by any candidate gateway.
pub async fn send_summary<T: EspNowTransport>(
    transport: &mut T,
    outcome: &SweepOutcome,
    serial_number: &str,
    battery_level: u8,
    cfg: &BeaconConfig,
) -> bool {
    if outcome.gateways.is_empty() {
        info!("reporter: no gateways replied, nothing to send");
        return false;
    }

    let mut candidates = outcome.gateways.clone();
    candidates.sort_by(|a, b| b.rssi_dbm.cmp(&a.rssi_dbm));
    candidates.truncate(cfg.max_report_candidates.min(candidates.len()));

    let summary = BeaconSummary {
        serial_number: serial_number.to_string(),
        battery_level,
        floor: outcome.floor,
        timestamp: String::new(), // stamped by the gateway on relay (§4.10)
        measurements: outcome
            .observations
            .iter()
            .map(|o| MeasurementSlot {
                anchor_mac: o.anchor_id,
                distance_meters: o.distance_m,
                variance: o.variance_m2,
                rssi: o.rssi_dbm,
                sample_count: o.sample_count,
                rtt_nanoseconds: o.rtt_ns,
            })
            .collect(),
    };

    let wire = match summary.to_wire() {
        Ok(w) => w,
        Err(e) => {
            warn!("reporter: failed to encode summary: {e}");
            return false;
        }
    };

    for gw in &candidates {
        transport.set_channel(gw.channel).await;
        tokio::time::sleep(Duration::from_millis(cfg.report_channel_settle_ms)).await;

        if !transport.add_peer(gw.mac).await {
            warn!("reporter: peer add failed for {}, trying next candidate", gw.mac);
            continue;
        }

        for attempt in 0..cfg.max_send_retry {
            let ack = tokio::time::timeout(
                Duration::from_millis(cfg.send_ack_timeout_ms),
                transport.send(gw.mac, &wire),
            )
            .await
            .unwrap_or(false);

            if ack {
                info!("reporter: delivered summary to {} on attempt {}", gw.mac, attempt + 1);
                return true;
            }

            if attempt + 1 < cfg.max_send_retry {
                tokio::time::sleep(Duration::from_millis(cfg.send_retry_backoff_ms)).await;
            }
        }
        warn!("reporter: exhausted retries against {}, trying next candidate", gw.mac);
    }

    false
}
