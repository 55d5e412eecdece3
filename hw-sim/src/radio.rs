//! Synthetic Wi-Fi scan + FTM ranging, standing in for the real radio driver
//! (spec §1 — out of scope, accessed only through the `WifiScanner`/`FtmDriver`
//! interfaces). Modeled the same way the physics layer in a hardware-accurate
//! node simulator would: configurable noise around a ground-truth distance,
//! plus an explicit failure-injection knob for the §7 error paths.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use ftm_types::{GatewayRecord, MacAddr};

use crate::traits::{FtmDriver, FtmError, WifiScanner};

/// Speed of light, m/s (spec §4.2).
pub const SPEED_OF_LIGHT_MPS: f64 = 299_792_458.0;

/// Tunable parameters for the simulated FTM physics.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RadioConfig {
    /// Frames per burst session (spec §4.2 `FRM`).
    pub frames_per_session: usize,
    /// Raw-RTT noise, picoseconds, one standard deviation.
    pub sigma_rtt_ps: f64,
    /// Fraction of samples replaced with a gross outlier.
    pub outlier_rate: f64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            frames_per_session: 24,
            sigma_rtt_ps: 600.0,
            outlier_rate: 0.0,
        }
    }
}

/// Ground-truth world the simulated radio draws samples from: the
/// true (uncalibrated, driver-reported) distance to each anchor, and which
/// anchors should behave as unsupported or permanently-timing-out.
#[derive(Debug, Clone, Default)]
pub struct SimWorld {
    /// anchor mac -> true distance in meters (the value FTM would converge to
    /// *before* the §4.2 calibration scale is applied).
    pub true_distance_m: HashMap<MacAddr, f64>,
    pub unsupported: HashSet<MacAddr>,
    pub always_timeout: HashSet<MacAddr>,
}

/// Simulated FTM driver: generates raw per-sample RTTs (picoseconds) around
/// a ground-truth distance, with configurable noise and failure injection.
pub struct SimFtmDriver {
    world: SimWorld,
    config: RadioConfig,
}

impl SimFtmDriver {
    pub fn new(world: SimWorld, config: RadioConfig) -> Self {
        Self { world, config }
    }
}

impl FtmDriver for SimFtmDriver {
    async fn measure(&mut self, anchor: MacAddr) -> Result<Vec<i64>, FtmError> {
        if self.world.unsupported.contains(&anchor) {
            return Err(FtmError::Unsupported);
        }
        if self.world.always_timeout.contains(&anchor) {
            return Err(FtmError::Timeout);
        }

        let true_distance_m = *self.world.true_distance_m.get(&anchor).unwrap_or(&2.0);
        let true_rtt_ps = true_distance_m * 2.0 / SPEED_OF_LIGHT_MPS * 1e12;

        let mut rng = rand::thread_rng();
        let noise = Normal::new(0.0, self.config.sigma_rtt_ps).unwrap();

        let samples = (0..self.config.frames_per_session)
            .map(|_| {
                if rng.gen_bool(self.config.outlier_rate) {
                    // A gross outlier: several times the expected RTT.
                    (true_rtt_ps * 5.0) as i64
                } else {
                    (true_rtt_ps + noise.sample(&mut rng)).max(0.0) as i64
                }
            })
            .collect();

        Ok(samples)
    }
}

/// Simulated Wi-Fi scanner: returns a fixed, pre-configured set of gateways
/// already filtered to SSID `"Gateway_Network"` (the filter itself lives in
/// the real driver, out of scope here — this just models its result).
#[derive(Debug, Clone, Default)]
pub struct SimWifiScanner {
    pub gateways: Vec<GatewayRecord>,
}

impl SimWifiScanner {
    pub fn new(gateways: Vec<GatewayRecord>) -> Self {
        Self { gateways }
    }
}

impl WifiScanner for SimWifiScanner {
    async fn scan(&mut self) -> Vec<GatewayRecord> {
        self.gateways.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn measure_centers_on_ground_truth() {
        let anchor = MacAddr([1, 2, 3, 4, 5, 6]);
        let mut world = SimWorld::default();
        world.true_distance_m.insert(anchor, 6.0); // matches S1's raw 6.0 m
        let mut driver = SimFtmDriver::new(world, RadioConfig { sigma_rtt_ps: 1.0, ..Default::default() });

        let samples = driver.measure(anchor).await.unwrap();
        assert_eq!(samples.len(), 24);
        let mean: f64 = samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64;
        assert!((mean - 40_000.0).abs() < 500.0, "mean={mean}");
    }

    #[tokio::test]
    async fn unsupported_anchor_errors_without_samples() {
        let anchor = MacAddr([9, 9, 9, 9, 9, 9]);
        let mut world = SimWorld::default();
        world.unsupported.insert(anchor);
        let mut driver = SimFtmDriver::new(world, RadioConfig::default());
        assert_eq!(driver.measure(anchor).await, Err(FtmError::Unsupported));
    }
}
