pub mod phase_locked;
pub mod spectral;
pub mod time_locked;

pub use phase_locked::PhaseLockedAverage;
pub use spectral::{SpectralAverage, TimeFrequency};
pub use time_locked::TimeLockedAverage;

use crate::error::{Result, SlowWaveError};

/// Longest window an accumulator can be allocated for.
const MAX_WINDOW: usize = isize::MAX as usize / std::mem::size_of::<f64>();

/// Auxiliary signals need a positive, finite sample rate.
pub(crate) fn check_rate(fs: f64) -> Result<()> {
    if !(fs > 0.0) || !fs.is_finite() {
        return Err(SlowWaveError::InvalidInput(format!(
            "auxiliary sample rate must be positive and finite, got {fs}"
        )));
    }
    Ok(())
}

/// `sec` seconds as a sample count at `fs`.
pub(crate) fn samples_in(sec: f64, fs: f64) -> Result<usize> {
    let n = (sec * fs).round();
    if !n.is_finite() || n < 0.0 || n > MAX_WINDOW as f64 {
        return Err(SlowWaveError::Config(format!(
            "{sec}s at {fs}Hz does not fit in a window"
        )));
    }
    Ok(n as usize)
}

/// Length of a window assembled from `parts`.
pub(crate) fn window_len(parts: &[usize]) -> Result<usize> {
    parts
        .iter()
        .try_fold(0usize, |acc, &p| acc.checked_add(p))
        .filter(|&n| n <= MAX_WINDOW)
        .ok_or_else(|| SlowWaveError::Config(format!("window of {parts:?} samples is too long")))
}

/// `sum / count` per slot; slots without contributions come out as NaN.
pub(crate) fn finish_means(sum: &[f64], count: &[usize]) -> Vec<f64> {
    sum.iter()
        .zip(count)
        .map(|(s, &c)| if c == 0 { f64::NAN } else { s / c as f64 })
        .collect()
}
