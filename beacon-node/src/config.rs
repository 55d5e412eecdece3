//! Beacon-side configuration (spec §9: calibration factor exposed as
//! configuration rather than compiled in; part of the C11 ambient layer).

use serde::Deserialize;

fn default_calibration_factor() -> f64 {
    0.20
}
fn default_frames_per_session() -> usize {
    24
}
fn default_min_valid_samples() -> usize {
    6
}
fn default_max_ftm_retry() -> u32 {
    2
}
fn default_max_variance_threshold() -> f64 {
    0.10
}
fn default_inter_attempt_delay_ms() -> u64 {
    200
}
fn default_ftm_timeout_ms() -> u64 {
    6_000
}
fn default_gateway_ssid() -> String {
    "Gateway_Network".to_string()
}
fn default_top_k_anchors() -> usize {
    3
}
fn default_max_report_candidates() -> usize {
    2
}
fn default_max_send_retry() -> u32 {
    3
}
fn default_send_ack_timeout_ms() -> u64 {
    100
}
fn default_send_retry_backoff_ms() -> u64 {
    50
}
fn default_channel_switch_settle_ms() -> u64 {
    200
}
fn default_report_channel_settle_ms() -> u64 {
    100
}
fn default_floor_dwell_ms() -> u64 {
    1_000
}
fn default_sleep_duration_ms() -> u64 {
    5_000
}
fn default_fallback_pref_dbm() -> f64 {
    -40.0
}
fn default_fallback_path_loss_exponent() -> f64 {
    2.0
}
fn default_fallback_variance_m2() -> f64 {
    10.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct BeaconConfig {
    /// NUL-padded to 10 ASCII bytes on the wire (spec §6).
    pub serial_number: String,

    /// C2: empirically-derived raw-to-real distance scale (spec §4.2, §9).
    #[serde(default = "default_calibration_factor")]
    pub calibration_factor: f64,
    #[serde(default = "default_frames_per_session")]
    pub frames_per_session: usize,
    #[serde(default = "default_min_valid_samples")]
    pub min_valid_samples: usize,
    #[serde(default = "default_ftm_timeout_ms")]
    pub ftm_timeout_ms: u64,

    /// C3: retry policy.
    #[serde(default = "default_max_ftm_retry")]
    pub max_ftm_retry: u32,
    #[serde(default = "default_max_variance_threshold")]
    pub max_variance_threshold: f64,
    #[serde(default = "default_inter_attempt_delay_ms")]
    pub inter_attempt_delay_ms: u64,

    /// C5: scan + sweep.
    #[serde(default = "default_gateway_ssid")]
    pub gateway_ssid: String,
    #[serde(default = "default_floor_dwell_ms")]
    pub floor_dwell_ms: u64,
    #[serde(default = "default_channel_switch_settle_ms")]
    pub channel_switch_settle_ms: u64,
    #[serde(default = "default_top_k_anchors")]
    pub top_k_anchors: usize,
    #[serde(default = "default_sleep_duration_ms")]
    pub sleep_duration_ms: u64,

    /// C6: reporter.
    #[serde(default = "default_max_report_candidates")]
    pub max_report_candidates: usize,
    #[serde(default = "default_max_send_retry")]
    pub max_send_retry: u32,
    #[serde(default = "default_send_ack_timeout_ms")]
    pub send_ack_timeout_ms: u64,
    #[serde(default = "default_send_retry_backoff_ms")]
    pub send_retry_backoff_ms: u64,
    #[serde(default = "default_report_channel_settle_ms")]
    pub report_channel_settle_ms: u64,

    /// C2 §7 fallback: log-distance path-loss model parameters.
    #[serde(default = "default_fallback_pref_dbm")]
    pub fallback_pref_dbm: f64,
    #[serde(default = "default_fallback_path_loss_exponent")]
    pub fallback_path_loss_exponent: f64,
    #[serde(default = "default_fallback_variance_m2")]
    pub fallback_variance_m2: f64,
}

impl BeaconConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .unwrap_or_else(|_| include_str!("../config.default.toml").to_string());
        Ok(toml::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_from_bundled_config() {
        let cfg = BeaconConfig::load("does-not-exist.toml").unwrap();
        assert_eq!(cfg.calibration_factor, 0.20);
        assert_eq!(cfg.max_ftm_retry, 2);
    }
}
