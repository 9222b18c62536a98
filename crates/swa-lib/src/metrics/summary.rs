use crate::{
    detectors::slow_wave::SlowWave,
    metrics::stats::{mean, median},
    signal::TickInterval,
};
use serde::{Deserialize, Serialize};

/// One central-tendency view (mean or median) over the accepted waves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveStats {
    pub neg_peak: f64,
    pub peak_to_peak: f64,
    pub duration_sec: f64,
    pub negative_duration_sec: f64,
    pub positive_duration_sec: f64,
    /// `None` when no accepted wave defines the slope.
    pub slope_neg1: Option<f64>,
    pub slope_neg2: Option<f64>,
    pub slope_pos1: Option<f64>,
    pub slope_pos2: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlowWaveSummary {
    pub count: usize,
    /// Waves per minute of recording.
    pub rate_per_min: f64,
    pub mean: WaveStats,
    pub median: WaveStats,
}

struct Columns {
    neg_peak: Vec<f64>,
    peak_to_peak: Vec<f64>,
    duration: Vec<f64>,
    negative_duration: Vec<f64>,
    positive_duration: Vec<f64>,
    slopes: [Vec<f64>; 4],
}

impl Columns {
    fn collect(waves: &[SlowWave]) -> Self {
        let mut slopes: [Vec<f64>; 4] = Default::default();
        for w in waves {
            let each = [w.slope_neg1(), w.slope_neg2(), w.slope_pos1(), w.slope_pos2()];
            for (acc, s) in slopes.iter_mut().zip(each) {
                if let Some(s) = s {
                    acc.push(s);
                }
            }
        }
        Self {
            neg_peak: waves.iter().map(|w| w.down.amplitude).collect(),
            peak_to_peak: waves.iter().map(SlowWave::peak_to_peak).collect(),
            duration: waves.iter().map(SlowWave::duration_sec).collect(),
            negative_duration: waves.iter().map(SlowWave::negative_duration_sec).collect(),
            positive_duration: waves.iter().map(SlowWave::positive_duration_sec).collect(),
            slopes,
        }
    }

    fn reduce(&self, f: fn(&[f64]) -> f64) -> WaveStats {
        let opt = |v: &Vec<f64>| if v.is_empty() { None } else { Some(f(v)) };
        WaveStats {
            neg_peak: f(&self.neg_peak),
            peak_to_peak: f(&self.peak_to_peak),
            duration_sec: f(&self.duration),
            negative_duration_sec: f(&self.negative_duration),
            positive_duration_sec: f(&self.positive_duration),
            slope_neg1: opt(&self.slopes[0]),
            slope_neg2: opt(&self.slopes[1]),
            slope_pos1: opt(&self.slopes[2]),
            slope_pos2: opt(&self.slopes[3]),
        }
    }
}

impl SlowWaveSummary {
    pub fn from_waves(waves: &[SlowWave], signal_duration_sec: f64) -> Self {
        let count = waves.len();
        let rate_per_min = if signal_duration_sec > 0.0 {
            count as f64 / (signal_duration_sec / 60.0)
        } else {
            0.0
        };
        let columns = Columns::collect(waves);
        Self {
            count,
            rate_per_min,
            mean: columns.reduce(mean),
            median: columns.reduce(median),
        }
    }
}

/// Number of waves whose onset falls inside each epoch. A wave straddling an
/// epoch boundary is counted once, in the epoch holding its onset.
pub fn epoch_counts(waves: &[SlowWave], epochs: &[TickInterval]) -> Vec<usize> {
    epochs
        .iter()
        .map(|epoch| {
            waves
                .iter()
                .take_while(|w| w.ticks.start < epoch.stop)
                .filter(|w| epoch.contains(w.ticks.start))
                .count()
        })
        .collect()
}
