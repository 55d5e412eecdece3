//! Gateway-side configuration (C11 ambient layer).

use serde::Deserialize;

fn default_broadcast_interval_ms() -> u64 {
    1_000
}
fn default_broadcast_jitter_ms() -> u64 {
    100
}
fn default_ingress_queue_capacity() -> usize {
    10
}
fn default_kalman_process_noise() -> f64 {
    0.05
}
fn default_beacon_timeout_ms() -> u64 {
    60_000
}
fn default_max_kalman_entries() -> usize {
    60
}
fn default_server_url() -> String {
    "http://127.0.0.1:8080/api/locations/calculate".to_string()
}
fn default_http_timeout_ms() -> u64 {
    5_000
}
fn default_http_max_retry() -> u32 {
    3
}
fn default_http_retry_backoff_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// C7: floor broadcast cadence.
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,
    #[serde(default = "default_broadcast_jitter_ms")]
    pub broadcast_jitter_ms: u64,

    /// C8: ingress queue.
    #[serde(default = "default_ingress_queue_capacity")]
    pub ingress_queue_capacity: usize,

    /// C9: Kalman table.
    #[serde(default = "default_kalman_process_noise")]
    pub kalman_process_noise: f64,
    #[serde(default = "default_beacon_timeout_ms")]
    pub beacon_timeout_ms: u64,
    #[serde(default = "default_max_kalman_entries")]
    pub max_kalman_entries: usize,

    /// C10: relay / HTTP egress.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
    #[serde(default = "default_http_max_retry")]
    pub http_max_retry: u32,
    #[serde(default = "default_http_retry_backoff_ms")]
    pub http_retry_backoff_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            broadcast_interval_ms: default_broadcast_interval_ms(),
            broadcast_jitter_ms: default_broadcast_jitter_ms(),
            ingress_queue_capacity: default_ingress_queue_capacity(),
            kalman_process_noise: default_kalman_process_noise(),
            beacon_timeout_ms: default_beacon_timeout_ms(),
            max_kalman_entries: default_max_kalman_entries(),
            server_url: default_server_url(),
            http_timeout_ms: default_http_timeout_ms(),
            http_max_retry: default_http_max_retry(),
            http_retry_backoff_ms: default_http_retry_backoff_ms(),
        }
    }
}

impl GatewayConfig {
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
        let cfg = GatewayConfig::load("does-not-exist.toml").unwrap();
        assert_eq!(cfg.max_kalman_entries, 60);
        assert_eq!(cfg.beacon_timeout_ms, 60_000);
    }
}
