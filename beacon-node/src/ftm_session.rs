//! C2 — FTM Ranging Session. One FTM exchange against one anchor.

use std::time::Duration;

use ftm_types::{AnchorObservation, MacAddr};
use hw_sim::{FtmDriver, FtmError, SPEED_OF_LIGHT_MPS};

use crate::stats;

/// Raw-RTT validity window, picoseconds (0.15 m – 50 m one-way, spec §4.2).
const RAW_VALID_MIN_PS: i64 = 1_000;
const RAW_VALID_MAX_PS: i64 = 333_000;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RangingError {
    #[error("driver does not support FTM for this anchor")]
    Unsupported,
    #[error("FTM session timed out")]
    Timeout,
    #[error("no sample survived raw-validity and calibration range filtering")]
    NoValidSamples,
}

impl From<FtmError> for RangingError {
    fn from(e: FtmError) -> Self {
        match e {
            FtmError::Unsupported => RangingError::Unsupported,
            FtmError::Timeout => RangingError::Timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionResult {
    pub distance_m: f64,
    pub variance_m2: f64,
    pub sample_count: usize,
}

fn is_raw_valid(rtt_ps: i64) -> bool {
    (RAW_VALID_MIN_PS..=RAW_VALID_MAX_PS).contains(&rtt_ps)
}

fn raw_distance_m(rtt_ps: i64) -> f64 {
    rtt_ps as f64 * 1e-12 * SPEED_OF_LIGHT_MPS / 2.0
}

/// Run one FTM burst against `anchor` and reduce the samples to a single
/// calibrated distance estimate (spec §4.2).
pub async fn run_session<D: FtmDriver>(
    driver: &mut D,
    anchor: MacAddr,
    calibration_factor: f64,
    min_valid_samples: usize,
    ftm_timeout_ms: u64,
) -> Result<SessionResult, RangingError> {
    let raw_ps = match tokio::time::timeout(Duration::from_millis(ftm_timeout_ms), driver.measure(anchor)).await {
        Ok(result) => result?,
        Err(_elapsed) => return Err(RangingError::Timeout),
    };

    let mut distances: Vec<f64> = raw_ps
        .into_iter()
        .filter(|&ps| is_raw_valid(ps))
        .map(raw_distance_m)
        .map(|d_raw| d_raw * calibration_factor)
        .filter(|&d| (AnchorObservation::MIN_DISTANCE_M as f64..=AnchorObservation::MAX_DISTANCE_M as f64).contains(&d))
        .collect();

    if distances.is_empty() {
        return Err(RangingError::NoValidSamples);
    }

    if distances.len() >= min_valid_samples {
        stats::iqr_filter(&mut distances);
    }

    let median = stats::median(&distances);
    let variance = stats::variance(&distances, median);

    Ok(SessionResult { distance_m: median, variance_m2: variance, sample_count: distances.len() })
}
