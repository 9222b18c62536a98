use crate::{
    config::PhaseLockConfig,
    detectors::slow_wave::{SlowWave, SlowWaves},
    error::{Result, SlowWaveError},
    locking::finish_means,
};
use serde::{Deserialize, Serialize};

/// Auxiliary-signal means per circular phase bin. Bin `k` covers
/// `[k * width, (k + 1) * width)` degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseLockedAverage {
    pub bin_width_deg: f64,
    pub mean: Vec<f64>,
    pub count: Vec<usize>,
}

impl PhaseLockedAverage {
    fn empty(bins: usize) -> Self {
        Self {
            bin_width_deg: 360.0 / bins as f64,
            mean: Vec::new(),
            count: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Lower edge of each bin in degrees.
    pub fn bin_starts(&self) -> Vec<f64> {
        (0..self.mean.len())
            .map(|k| k as f64 * self.bin_width_deg)
            .collect()
    }
}

/// Upper edges of `bins` equal-width sectors of [0, 360).
pub fn bin_bounds(bins: usize) -> Vec<f64> {
    let width = 360.0 / bins as f64;
    (1..=bins).map(|k| k as f64 * width).collect()
}

/// Bin holding `x`, trying `last` first since consecutive samples rarely move far.
/// Values at or beyond the final edge land in the last bin.
pub fn phase_bin(x: f64, bounds: &[f64], last: usize) -> usize {
    let nb = bounds.len();
    let last = last.min(nb - 1);
    if x < bounds[last] && (last == 0 || x >= bounds[last - 1]) {
        return last;
    }
    let from = if x >= bounds[last] { last + 1 } else { 0 };
    (from..nb).find(|&b| x < bounds[b]).unwrap_or(nb - 1)
}

/// Average `aux` over the samples of every wave, binned by each wave's own phase.
/// Samples without a finite phase are left out.
pub fn phase_locked_average(
    waves: &[SlowWave],
    aux: &[f64],
    bins: usize,
    mask: Option<&[bool]>,
) -> Result<PhaseLockedAverage> {
    if bins == 0 {
        return Err(SlowWaveError::Config(
            "number of phase bins must be at least 1".into(),
        ));
    }
    if waves.is_empty() {
        return Ok(PhaseLockedAverage::empty(bins));
    }
    let extent = waves.iter().map(|w| w.samples.stop).max().unwrap_or(0);
    if aux.len() < extent {
        return Err(SlowWaveError::InvalidInput(format!(
            "auxiliary signal has {} samples, waves extend to {}",
            aux.len(),
            extent
        )));
    }
    if let Some(mask) = mask {
        if mask.len() < extent {
            return Err(SlowWaveError::InvalidInput(format!(
                "mask has {} samples, waves extend to {}",
                mask.len(),
                extent
            )));
        }
    }

    let bounds = bin_bounds(bins);
    let mut sum = vec![0.0; bins];
    let mut count = vec![0usize; bins];
    for w in waves {
        if w.phase.len() != w.samples.len() {
            return Err(SlowWaveError::PhaseNotAnnotated);
        }
        let mut last = 0;
        for (p, &ph) in (w.samples.start..w.samples.stop).zip(&w.phase) {
            if ph.is_finite() && mask.map_or(true, |m| m[p]) {
                let b = phase_bin(ph, &bounds, last);
                last = b;
                sum[b] += aux[p];
                count[b] += 1;
            }
        }
    }

    Ok(PhaseLockedAverage {
        bin_width_deg: 360.0 / bins as f64,
        mean: finish_means(&sum, &count),
        count,
    })
}

impl SlowWaves {
    /// Phase-locked average of a signal co-sampled with the detection trace.
    pub fn phase_locked_average(
        &self,
        aux: &[f64],
        cfg: &PhaseLockConfig,
        mask: Option<&[bool]>,
    ) -> Result<PhaseLockedAverage> {
        cfg.validate()?;
        if !self.is_phase_annotated() {
            return Err(SlowWaveError::PhaseNotAnnotated);
        }
        if aux.len() != self.ticks.len() {
            return Err(SlowWaveError::InvalidInput(format!(
                "auxiliary signal has {} samples, detection trace has {}",
                aux.len(),
                self.ticks.len()
            )));
        }
        phase_locked_average(&self.waves, aux, cfg.bins, mask)
    }
}
