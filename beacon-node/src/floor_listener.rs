//! C4 — Floor Listener. Passive collector of 1-byte floor broadcasts during
//! a channel dwell, plus the §4.5 floor-mode calculator.

use std::time::{Duration, Instant};

use ftm_types::FloorReport;
use hw_sim::EspNowTransport;

/// Accumulate `FloorReport`s heard on `channel` for `dwell_ms` (spec §4.4
/// step 2b).
pub async fn dwell_floor<T: EspNowTransport>(transport: &mut T, channel: u8, dwell_ms: u64) -> Vec<FloorReport> {
    let deadline = Instant::now() + Duration::from_millis(dwell_ms);
    let mut reports = Vec::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        if let Some((mac, payload, rssi)) = transport.recv(remaining).await {
            if payload.len() == 1 {
                reports.push(FloorReport { gateway_mac: mac, floor: payload[0] as i8, rssi_dbm: rssi, channel });
            }
            // Any other length on this channel is not a floor broadcast;
            // the beacon has nothing else to listen for here.
        }
    }

    reports
}

/// Modal floor across all reports heard this wake cycle (spec §4.5). Ties
/// broken by the lower floor number. Empty input reports `0` (unknown).
///
/// Tallies the full signed range `-99..=99` (a full histogram), not just
/// `0..9` — the distilled source's 0..9 tally array is flagged in spec §9 as
/// likely an oversight for buildings with negative or >9 floors.
pub fn floor_mode(reports: &[FloorReport]) -> i8 {
    if reports.is_empty() {
        return 0;
    }

    let mut counts = std::collections::BTreeMap::new();
    for r in reports {
        *counts.entry(r.floor).or_insert(0u32) += 1;
    }

    // BTreeMap iterates keys ascending, so the first max-count entry found
    // is already the lowest floor among ties.
    counts
        .into_iter()
        .max_by_key(|&(floor, count)| (count, std::cmp::Reverse(floor)))
        .map(|(floor, _)| floor)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftm_types::MacAddr;

    fn report(floor: i8) -> FloorReport {
        FloorReport { gateway_mac: MacAddr::ZERO, floor, rssi_dbm: -60, channel: 1 }
    }

    /// S6 — floor mode.
    #[test]
    fn modal_floor_of_mixed_reports() {
        let reports: Vec<_> = [3, 3, 2, 3, 1].into_iter().map(report).collect();
        assert_eq!(floor_mode(&reports), 3);
    }

    #[test]
    fn empty_reports_yield_unknown_sentinel() {
        assert_eq!(floor_mode(&[]), 0);
    }

    #[test]
    fn ties_break_to_lower_floor() {
        let reports: Vec<_> = [5, 5, -2, -2].into_iter().map(report).collect();
        assert_eq!(floor_mode(&reports), -2);
    }

    #[test]
    fn negative_and_double_digit_floors_are_tallied() {
        let reports: Vec<_> = [-5, -5, -5, 12].into_iter().map(report).collect();
        assert_eq!(floor_mode(&reports), -5);
    }
}
