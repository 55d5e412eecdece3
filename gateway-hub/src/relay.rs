//! C10 — Relay / Serializer. Sole consumer of the ingress queue and sole
//! writer of the Kalman table (spec §5), so neither needs a lock.

use chrono::Utc;
use ftm_types::BeaconSummary;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::kalman::KalmanTable;

#[derive(Debug, Serialize)]
struct MeasurementBody {
    anchor_mac: String,
    distance_meters: f64,
    rssi: i8,
    rtt_nanoseconds: u32,
}

/// Field order matches the canonical JSON body in spec §6.
#[derive(Debug, Serialize)]
struct LocationBody {
    battery_level: u8,
    floor: i8,
    measurements: Vec<MeasurementBody>,
    serial_number: String,
    timestamp: String,
}

fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

fn stamp_iso8601() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Build the outgoing JSON body for one dequeued summary, applying the
/// Kalman smoother per slot (spec §4.10 steps 1-4).
fn build_body(summary: &BeaconSummary, table: &mut KalmanTable, now: u64) -> LocationBody {
    let measurements = summary
        .measurements
        .iter()
        .filter(|slot| !slot.anchor_mac.is_zero())
        .map(|slot| {
            let raw = slot.distance_meters as f64;
            let filtered = match table.observe(&summary.serial_number, slot.anchor_mac, raw, slot.variance as f64, now) {
                Ok(x) => x,
                Err(_) => {
                    warn!("relay: kalman table full, relaying raw distance for {}", slot.anchor_mac);
                    raw
                }
            };
            MeasurementBody {
                anchor_mac: slot.anchor_mac.to_string(),
                distance_meters: filtered,
                rssi: slot.rssi,
                rtt_nanoseconds: slot.rtt_nanoseconds,
            }
        })
        .collect();

    LocationBody {
        battery_level: summary.battery_level,
        floor: summary.floor,
        measurements,
        serial_number: summary.serial_number.clone(),
        timestamp: stamp_iso8601(),
    }
}

/// POST the body to `server_url`, retrying on non-2xx/transport error
/// (spec §4.10 step 5, §7).
async fn post_with_retry(client: &reqwest::Client, server_url: &str, body: &LocationBody, cfg: &GatewayConfig) -> bool {
    for attempt in 0..cfg.http_max_retry {
        let result = client
            .post(server_url)
            .timeout(std::time::Duration::from_millis(cfg.http_timeout_ms))
            .json(body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => return true,
            Ok(resp) => warn!("relay: POST returned {} on attempt {}", resp.status(), attempt + 1),
            Err(e) => warn!("relay: POST failed on attempt {}: {e}", attempt + 1),
        }

        if attempt + 1 < cfg.http_max_retry {
            tokio::time::sleep(std::time::Duration::from_millis(cfg.http_retry_backoff_ms)).await;
        }
    }
    false
}

/// Drain the ingress queue forever: parse each frame, smooth, relay.
pub async fn run(mut rx: mpsc::Receiver<Vec<u8>>, cfg: GatewayConfig) {
    let client = reqwest::Client::new();
    let mut table = KalmanTable::new(cfg.max_kalman_entries, cfg.kalman_process_noise, cfg.beacon_timeout_ms);

    while let Some(frame) = rx.recv().await {
        let summary = match BeaconSummary::from_wire(&frame) {
            Ok(s) => s,
            Err(e) => {
                warn!("relay: malformed beacon summary: {e}");
                continue;
            }
        };

        let body = build_body(&summary, &mut table, now_ms());
        let delivered = post_with_retry(&client, &cfg.server_url, &body, &cfg).await;
        if delivered {
            info!("relay: delivered summary from {}", body.serial_number);
        } else {
            warn!("relay: dropping summary from {} after exhausting retries", body.serial_number);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftm_types::MacAddr;

    fn sample_summary() -> BeaconSummary {
        BeaconSummary {
            serial_number: "S-03".to_string(),
            battery_level: 91,
            floor: 3,
            timestamp: String::new(),
            measurements: vec![
                ftm_types::MeasurementSlot {
                    anchor_mac: MacAddr([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]),
                    distance_meters: 2.47,
                    variance: 0.02,
                    rssi: -58,
                    sample_count: 24,
                    rtt_nanoseconds: 82,
                },
                ftm_types::MeasurementSlot {
                    anchor_mac: MacAddr::ZERO,
                    distance_meters: 0.0,
                    variance: 0.0,
                    rssi: 0,
                    sample_count: 0,
                    rtt_nanoseconds: 0,
                },
            ],
        }
    }

    /// Matches the example body in spec §6: field order + per-field content.
    #[test]
    fn body_field_order_matches_the_wire_contract() {
        let summary = sample_summary();
        let mut table = KalmanTable::new(60, 0.05, 60_000);
        let body = build_body(&summary, &mut table, 0);

        let json = serde_json::to_string(&body).unwrap();
        let battery_idx = json.find("battery_level").unwrap();
        let floor_idx = json.find("\"floor\"").unwrap();
        let measurements_idx = json.find("measurements").unwrap();
        let serial_idx = json.find("serial_number").unwrap();
        let timestamp_idx = json.find("timestamp").unwrap();
        assert!(battery_idx < floor_idx);
        assert!(floor_idx < measurements_idx);
        assert!(measurements_idx < serial_idx);
        assert!(serial_idx < timestamp_idx);
    }

    #[test]
    fn skips_empty_measurement_slots() {
        let summary = sample_summary();
        let mut table = KalmanTable::new(60, 0.05, 60_000);
        let body = build_body(&summary, &mut table, 0);
        assert_eq!(body.measurements.len(), 1);
        assert_eq!(body.measurements[0].anchor_mac, "AA:BB:CC:DD:EE:01");
    }

    #[test]
    fn kalman_unavailable_falls_back_to_raw_distance() {
        let summary = sample_summary();
        let mut table = KalmanTable::new(1, 0.05, 60_000);
        // Fill the one slot with an unrelated link so this summary's anchor
        // can never be admitted.
        table.observe("other", MacAddr([1, 1, 1, 1, 1, 1]), 9.0, 0.1, 0).unwrap();

        let body = build_body(&summary, &mut table, 0);
        assert!((body.measurements[0].distance_meters - 2.47).abs() < 1e-4);
    }

    #[test]
    fn timestamp_matches_iso8601_millisecond_shape() {
        let ts = stamp_iso8601();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2025-10-22T12:15:30.123Z".len());
    }
}
