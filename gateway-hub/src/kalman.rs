//! C9 — Per-link Kalman Smoother. A flat table of scalar range filters keyed
//! by `(serial_number, anchor_mac)`, touched only by the relay task (spec §5)
//! so it needs no lock.

use std::collections::HashMap;

use ftm_types::MacAddr;

/// Key identifying one (beacon, anchor) link.
pub type LinkKey = (String, MacAddr);

/// Scalar Kalman state tracking a single 1-D range estimate (spec §3, §4.9).
#[derive(Debug, Clone, Copy)]
pub struct KalmanLinkState {
    pub x: f64,
    pub p: f64,
    pub q: f64,
    pub r: f64,
    pub last_update_ms: u64,
    pub last_seen_ms: u64,
}

impl KalmanLinkState {
    fn init(z: f64, z_var: f64, now_ms: u64, process_noise: f64) -> Self {
        KalmanLinkState { x: z, p: z_var, q: process_noise, r: z_var, last_update_ms: now_ms, last_seen_ms: now_ms }
    }

    /// One predict+update step (spec §4.9).
    fn update(&mut self, z: f64, z_var: f64, now_ms: u64) {
        let dt_s = (now_ms.saturating_sub(self.last_update_ms)) as f64 / 1000.0;
        let p_pred = self.p + self.q * dt_s;
        self.r = z_var;
        let k = p_pred / (p_pred + self.r);
        self.x += k * (z - self.x);
        self.p = (1.0 - k) * p_pred;
        self.last_update_ms = now_ms;
        self.last_seen_ms = now_ms;
    }
}

/// Why an observation could not be smoothed (spec §7 "Kalman table full").
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("kalman table is full after eviction, relaying raw measurement")]
pub struct TableFullError;

/// Bounded table of live links; admission-controlled at `max_entries`.
pub struct KalmanTable {
    entries: HashMap<LinkKey, KalmanLinkState>,
    max_entries: usize,
    process_noise: f64,
    timeout_ms: u64,
}

impl KalmanTable {
    pub fn new(max_entries: usize, process_noise: f64, timeout_ms: u64) -> Self {
        KalmanTable { entries: HashMap::with_capacity(max_entries), max_entries, process_noise, timeout_ms }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry idle for at least `timeout_ms` (spec §4.9 eviction pass).
    fn evict_stale(&mut self, now_ms: u64) {
        let timeout_ms = self.timeout_ms;
        self.entries.retain(|_, state| now_ms.saturating_sub(state.last_seen_ms) < timeout_ms);
    }

    /// Apply one observation to the (serial, anchor) link, inserting lazily
    /// on first sight. Returns the filtered distance, or `Err(TableFullError)`
    /// if the table is full even after evicting stale entries — the caller
    /// should then relay the raw measurement.
    pub fn observe(
        &mut self,
        serial_number: &str,
        anchor_mac: MacAddr,
        z: f64,
        z_var: f64,
        now_ms: u64,
    ) -> Result<f64, TableFullError> {
        let key = (serial_number.to_string(), anchor_mac);

        if let Some(state) = self.entries.get_mut(&key) {
            state.update(z, z_var, now_ms);
            return Ok(state.x);
        }

        if self.entries.len() >= self.max_entries {
            self.evict_stale(now_ms);
        }
        if self.entries.len() >= self.max_entries {
            return Err(TableFullError);
        }

        let state = KalmanLinkState::init(z, z_var, now_ms, self.process_noise);
        let x = state.x;
        self.entries.insert(key, state);
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(n: u8) -> MacAddr {
        MacAddr([n, n, n, n, n, n])
    }

    /// S4 / invariant 4 — feeding a constant measurement drives `|x - z|`
    /// monotonically down to (near) zero; first step lands at 3.40 exactly
    /// (`K = P/(P+R) = 1.0/1.25 = 0.8`, `x = 5.0 + 0.8*(3.0-5.0) = 3.4`).
    #[test]
    fn converges_towards_a_constant_measurement() {
        let mut table = KalmanTable::new(60, 0.05, 60_000);
        let serial = "S-04";
        let anchor = mac(1);

        let x0 = table.observe(serial, anchor, 5.0, 1.0, 0).unwrap();
        assert!((x0 - 5.0).abs() < 1e-9);

        let mut prev_err = f64::INFINITY;
        let mut last_x = x0;
        for step in 1..=5u64 {
            let x = table.observe(serial, anchor, 3.0, 0.25, step * 1_000).unwrap();
            let err = (x - 3.0).abs();
            assert!(err <= prev_err + 1e-9, "step {step}: |x-z|={err} grew from {prev_err}");
            prev_err = err;
            last_x = x;
        }
        assert!((last_x - 3.0).abs() < 0.1, "did not converge near 3.0: x={last_x}");
    }

    #[test]
    fn idempotent_under_zero_variance_matching_measurement() {
        let mut table = KalmanTable::new(60, 0.05, 60_000);
        let x0 = table.observe("S-01", mac(2), 4.0, 0.1, 0).unwrap();
        let x1 = table.observe("S-01", mac(2), 4.0, 0.0, 1_000).unwrap();
        assert!((x0 - x1).abs() < 1e-9);
    }

    /// S5 — full table eviction.
    #[test]
    fn full_table_evicts_stale_entries_on_next_insert() {
        let mut table = KalmanTable::new(60, 0.05, 60_000);
        for i in 0..60u8 {
            table.observe(&format!("S-{i:02}"), mac(i), 2.0, 0.1, 0).unwrap();
        }
        assert_eq!(table.len(), 60);

        let now = 60_000 + 1;
        let x = table.observe("S-99", mac(99), 9.0, 0.1, now).unwrap();
        assert!((x - 9.0).abs() < 1e-9);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn table_full_of_fresh_entries_reports_unavailable() {
        let mut table = KalmanTable::new(2, 0.05, 60_000);
        table.observe("A", mac(1), 1.0, 0.1, 0).unwrap();
        table.observe("B", mac(2), 1.0, 0.1, 0).unwrap();
        let result = table.observe("C", mac(3), 1.0, 0.1, 0);
        assert_eq!(result, Err(TableFullError));
    }

    #[test]
    fn distinct_keys_do_not_collide() {
        let mut table = KalmanTable::new(60, 0.05, 60_000);
        table.observe("S-01", mac(1), 2.0, 0.1, 0).unwrap();
        table.observe("S-01", mac(2), 8.0, 0.1, 0).unwrap();
        assert_eq!(table.len(), 2);
    }
}
