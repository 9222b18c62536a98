use std::f64::consts::PI;

/// `amp * sin(2*pi*freq*t)` sampled at half-sample offsets so that no sample
/// lands exactly on a zero crossing.
pub(crate) fn sine_trace(freq: f64, fs: f64, secs: f64, amp: f64) -> Vec<f64> {
    let n = (secs * fs).round() as usize;
    (0..n)
        .map(|i| amp * (2.0 * PI * freq * (i as f64 + 0.5) / fs).sin())
        .collect()
}

pub(crate) fn assert_close(actual: f64, expected: f64, rel_tol: f64) {
    let tol = expected.abs().max(1.0) * rel_tol;
    let diff = (actual - expected).abs();
    assert!(
        diff <= tol,
        "expected {expected}, got {actual} (diff {diff} > tol {tol})"
    );
}
