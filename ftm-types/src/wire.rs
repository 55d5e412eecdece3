//! Fixed-layout wire encoding for `BeaconSummary` (spec §6).
//!
//! Deliberately hand-packed rather than derived: the layout is a contract
//! between two independently-clocked processes (beacon, gateway) and needs
//! an explicit byte offset for every field rather than whatever the
//! compiler's struct layout happens to produce.

use serde::{Deserialize, Serialize};

use crate::mac::MacAddr;

pub const SERIAL_LEN: usize = 10;
pub const TIMESTAMP_LEN: usize = 128;
pub const MAX_MEASUREMENTS: usize = 3;
const MEASUREMENT_WIRE_LEN: usize = 6 + 4 + 4 + 1 + 1 + 4; // 20 bytes
pub const BEACON_SUMMARY_WIRE_LEN: usize =
    SERIAL_LEN + 1 + 1 + TIMESTAMP_LEN + MAX_MEASUREMENTS * MEASUREMENT_WIRE_LEN; // 200

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    #[error("beacon summary must be exactly {BEACON_SUMMARY_WIRE_LEN} bytes, got {0}")]
    BadLength(usize),
    #[error("serial number is not valid ASCII")]
    BadSerial,
    #[error("timestamp is not valid ASCII")]
    BadTimestamp,
    #[error("more than {MAX_MEASUREMENTS} measurement slots")]
    TooManyMeasurements,
}

/// One measurement slot inside a `BeaconSummary`. An empty slot is all-zero
/// with `anchor_mac == MacAddr::ZERO`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSlot {
    pub anchor_mac: MacAddr,
    pub distance_meters: f32,
    pub variance: f32,
    pub rssi: i8,
    pub sample_count: u8,
    pub rtt_nanoseconds: u32,
}

impl MeasurementSlot {
    const EMPTY: MeasurementSlot = MeasurementSlot {
        anchor_mac: MacAddr::ZERO,
        distance_meters: 0.0,
        variance: 0.0,
        rssi: 0,
        sample_count: 0,
        rtt_nanoseconds: 0,
    };

    fn write_wire(&self, buf: &mut [u8]) {
        buf[0..6].copy_from_slice(&self.anchor_mac.0);
        buf[6..10].copy_from_slice(&self.distance_meters.to_le_bytes());
        buf[10..14].copy_from_slice(&self.variance.to_le_bytes());
        buf[14] = self.rssi as u8;
        buf[15] = self.sample_count;
        buf[16..20].copy_from_slice(&self.rtt_nanoseconds.to_le_bytes());
    }

    fn read_wire(buf: &[u8]) -> MeasurementSlot {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&buf[0..6]);
        MeasurementSlot {
            anchor_mac: MacAddr(mac),
            distance_meters: f32::from_le_bytes(buf[6..10].try_into().unwrap()),
            variance: f32::from_le_bytes(buf[10..14].try_into().unwrap()),
            rssi: buf[14] as i8,
            sample_count: buf[15],
            rtt_nanoseconds: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
        }
    }
}

/// The beacon → gateway summary packet (spec §3, §6).
///
/// `measurements` holds only the non-empty slots, front-packed; encoding to
/// wire bytes pads the remainder with zeroed slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconSummary {
    pub serial_number: String,
    pub battery_level: u8,
    /// -99..=99; 0 = unknown.
    pub floor: i8,
    /// Empty when sent by the beacon; stamped by the gateway on relay (§4.10).
    pub timestamp: String,
    pub measurements: Vec<MeasurementSlot>,
}

impl BeaconSummary {
    pub fn to_wire(&self) -> Result<[u8; BEACON_SUMMARY_WIRE_LEN], WireError> {
        if self.measurements.len() > MAX_MEASUREMENTS {
            return Err(WireError::TooManyMeasurements);
        }
        if !self.serial_number.is_ascii() {
            return Err(WireError::BadSerial);
        }
        if !self.timestamp.is_ascii() {
            return Err(WireError::BadTimestamp);
        }

        let mut buf = [0u8; BEACON_SUMMARY_WIRE_LEN];
        write_nul_padded(&mut buf[0..SERIAL_LEN], self.serial_number.as_bytes());
        buf[SERIAL_LEN] = self.battery_level;
        buf[SERIAL_LEN + 1] = self.floor as u8;

        let ts_start = SERIAL_LEN + 2;
        write_nul_padded(&mut buf[ts_start..ts_start + TIMESTAMP_LEN], self.timestamp.as_bytes());

        let meas_start = ts_start + TIMESTAMP_LEN;
        for i in 0..MAX_MEASUREMENTS {
            let slot = self.measurements.get(i).copied().unwrap_or(MeasurementSlot::EMPTY);
            let off = meas_start + i * MEASUREMENT_WIRE_LEN;
            slot.write_wire(&mut buf[off..off + MEASUREMENT_WIRE_LEN]);
        }

        Ok(buf)
    }

    pub fn from_wire(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() != BEACON_SUMMARY_WIRE_LEN {
            return Err(WireError::BadLength(bytes.len()));
        }

        let serial_number = read_nul_padded(&bytes[0..SERIAL_LEN]).map_err(|_| WireError::BadSerial)?;
        let battery_level = bytes[SERIAL_LEN];
        let floor = bytes[SERIAL_LEN + 1] as i8;

        let ts_start = SERIAL_LEN + 2;
        let timestamp =
            read_nul_padded(&bytes[ts_start..ts_start + TIMESTAMP_LEN]).map_err(|_| WireError::BadTimestamp)?;

        let meas_start = ts_start + TIMESTAMP_LEN;
        let mut measurements = Vec::with_capacity(MAX_MEASUREMENTS);
        for i in 0..MAX_MEASUREMENTS {
            let off = meas_start + i * MEASUREMENT_WIRE_LEN;
            let slot = MeasurementSlot::read_wire(&bytes[off..off + MEASUREMENT_WIRE_LEN]);
            if slot.anchor_mac.is_zero() {
                break; // slots are contiguous from index 0 (spec §3 invariant)
            }
            measurements.push(slot);
        }

        Ok(BeaconSummary { serial_number, battery_level, floor, timestamp, measurements })
    }
}

fn write_nul_padded(dst: &mut [u8], src: &[u8]) {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
}

fn read_nul_padded(src: &[u8]) -> Result<String, std::str::Utf8Error> {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    std::str::from_utf8(&src[..end]).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BeaconSummary {
        BeaconSummary {
            serial_number: "S-03".to_string(),
            battery_level: 91,
            floor: 3,
            timestamp: String::new(),
            measurements: vec![
                MeasurementSlot {
                    anchor_mac: MacAddr([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]),
                    distance_meters: 2.47,
                    variance: 0.02,
                    rssi: -58,
                    sample_count: 24,
                    rtt_nanoseconds: 82,
                },
            ],
        }
    }

    #[test]
    fn wire_length_is_200_bytes() {
        assert_eq!(BEACON_SUMMARY_WIRE_LEN, 200);
    }

    #[test]
    fn round_trips_bit_exactly() {
        let summary = sample();
        let wire = summary.to_wire().unwrap();
        let back = BeaconSummary::from_wire(&wire).unwrap();
        assert_eq!(summary, back);
    }

    #[test]
    fn empty_slots_are_contiguous() {
        let mut summary = sample();
        summary.measurements.push(MeasurementSlot {
            anchor_mac: MacAddr([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]),
            distance_meters: 1.0,
            variance: 0.01,
            rssi: -40,
            sample_count: 10,
            rtt_nanoseconds: 50,
        });
        let wire = summary.to_wire().unwrap();
        let back = BeaconSummary::from_wire(&wire).unwrap();
        assert_eq!(back.measurements.len(), 2);
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(BeaconSummary::from_wire(&[0u8; 10]), Err(WireError::BadLength(10)));
    }

    #[test]
    fn rejects_more_than_max_measurements() {
        let mut summary = sample();
        summary.measurements = vec![summary.measurements[0]; 4];
        assert_eq!(summary.to_wire(), Err(WireError::TooManyMeasurements));
    }
}
