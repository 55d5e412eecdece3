//! C1 — Statistics Kernel. Pure functions over real-valued sample arrays.

/// Middle value of `xs` (mean of the two middles on even count).
/// Undefined (panics) on empty input — callers must not call this on an
/// empty sample set.
pub fn median(xs: &[f64]) -> f64 {
    assert!(!xs.is_empty(), "median of empty sample set is undefined");
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// In-place outlier rejection via the interquartile range. No-op for
/// `|xs| < 4`. Q1/Q3 are read at indices `⌊n/4⌋`/`⌊3n/4⌋` of a sorted copy;
/// elements outside `[Q1 - 1.5·IQR, Q3 + 1.5·IQR]` are dropped. Surviving
/// elements keep their original relative order.
pub fn iqr_filter(xs: &mut Vec<f64>) {
    let n = xs.len();
    if n < 4 {
        return;
    }

    let mut sorted = xs.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let q1 = sorted[n / 4];
    let q3 = sorted[3 * n / 4];
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    xs.retain(|&v| v >= lower && v <= upper);
}

/// Population variance of `xs` around `center`: `Σ(xᵢ − center)² / n`.
pub fn variance(xs: &[f64], center: f64) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().map(|&v| (v - center).powi(2)).sum::<f64>() / xs.len() as f64
}
