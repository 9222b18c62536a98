use crate::error::SlowWaveError;
use serde::{Deserialize, Serialize};

/// Clock ticks per second for the timepoint sequences handed to the detector.
pub const TICKS_PER_SEC: u64 = 1_000_000_000;

pub fn ticks_to_sec(ticks: u64) -> f64 {
    ticks as f64 / TICKS_PER_SEC as f64
}

/// Basic typed time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
}

/// Borrowed view over a band-passed oscillatory trace and its timepoints.
#[derive(Debug, Clone, Copy)]
pub struct Recording<'a> {
    pub filtered: &'a [f64],
    /// One tick per sample, monotonically non-decreasing.
    pub ticks: &'a [u64],
    pub sample_rate: f64,
}

impl<'a> Recording<'a> {
    pub fn new(filtered: &'a [f64], ticks: &'a [u64], sample_rate: f64) -> Self {
        Self {
            filtered,
            ticks,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    pub fn duration_sec(&self) -> f64 {
        self.filtered.len() as f64 / self.sample_rate
    }

    pub fn check(&self) -> Result<(), SlowWaveError> {
        if !(self.sample_rate > 0.0) || !self.sample_rate.is_finite() {
            return Err(SlowWaveError::InvalidInput(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.filtered.len() != self.ticks.len() {
            return Err(SlowWaveError::InvalidInput(format!(
                "trace has {} samples but {} timepoints",
                self.filtered.len(),
                self.ticks.len()
            )));
        }
        Ok(())
    }
}

/// Evenly spaced ticks for a gap-free recording starting at tick 0.
pub fn contiguous_ticks(n: usize, sample_rate: f64) -> Vec<u64> {
    (0..n)
        .map(|i| (i as f64 * TICKS_PER_SEC as f64 / sample_rate).round() as u64)
        .collect()
}

/// Half-open range of sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleInterval {
    pub start: usize,
    pub stop: usize,
}

impl SampleInterval {
    pub fn len(&self) -> usize {
        self.stop.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.stop <= self.start
    }

    pub fn contains(&self, sample: usize) -> bool {
        sample >= self.start && sample < self.stop
    }

    pub fn overlaps(&self, other: &SampleInterval) -> bool {
        self.start < other.stop && other.start < self.stop
    }
}

/// Half-open range of ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInterval {
    pub start: u64,
    pub stop: u64,
}

impl TickInterval {
    pub fn new(start: u64, stop: u64) -> Self {
        Self { start, stop }
    }

    pub fn duration_sec(&self) -> f64 {
        ticks_to_sec(self.stop.saturating_sub(self.start))
    }

    pub fn contains(&self, tick: u64) -> bool {
        tick >= self.start && tick < self.stop
    }
}

/// Tells whether two sample indices are separated by a gap in the recording.
pub trait Discontinuity {
    fn spans_gap(&self, a: usize, b: usize) -> bool;
}

impl<F> Discontinuity for F
where
    F: Fn(usize, usize) -> bool,
{
    fn spans_gap(&self, a: usize, b: usize) -> bool {
        self(a, b)
    }
}

/// Recording without gaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct Continuous;

impl Discontinuity for Continuous {
    fn spans_gap(&self, _a: usize, _b: usize) -> bool {
        false
    }
}

/// Gap detector driven by the tick sequence: a gap exists between `a` and `b`
/// when the elapsed ticks exceed the nominal spacing by more than half a sample.
#[derive(Debug, Clone, Copy)]
pub struct TickGaps<'a> {
    ticks: &'a [u64],
    sample_rate: f64,
}

impl<'a> TickGaps<'a> {
    pub fn new(ticks: &'a [u64], sample_rate: f64) -> Self {
        Self { ticks, sample_rate }
    }

    pub fn from_recording(recording: &Recording<'a>) -> Self {
        Self::new(recording.ticks, recording.sample_rate)
    }
}

impl Discontinuity for TickGaps<'_> {
    fn spans_gap(&self, a: usize, b: usize) -> bool {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        if hi >= self.ticks.len() {
            return true;
        }
        let per_sample = TICKS_PER_SEC as f64 / self.sample_rate;
        let expected = (hi - lo) as f64 * per_sample;
        let elapsed = self.ticks[hi].saturating_sub(self.ticks[lo]) as f64;
        elapsed > expected + 0.5 * per_sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_ticks_have_no_gaps() {
        let ticks = contiguous_ticks(500, 128.0);
        let gaps = TickGaps::new(&ticks, 128.0);
        assert!(!gaps.spans_gap(0, 499));
        assert!(!gaps.spans_gap(200, 10));
    }

    #[test]
    fn tick_jump_is_reported_as_gap() {
        let mut ticks = contiguous_ticks(300, 100.0);
        for t in ticks.iter_mut().skip(151) {
            *t += 5 * TICKS_PER_SEC;
        }
        let gaps = TickGaps::new(&ticks, 100.0);
        assert!(gaps.spans_gap(100, 200));
        assert!(gaps.spans_gap(150, 151));
        assert!(!gaps.spans_gap(0, 150));
        assert!(!gaps.spans_gap(151, 299));
    }

    #[test]
    fn closures_act_as_predicates() {
        let disc = |a: usize, b: usize| a <= 150 && b > 150;
        assert!(disc.spans_gap(100, 200));
        assert!(!Continuous.spans_gap(100, 200));
    }

    #[test]
    fn recording_check_rejects_mismatch() {
        let data = vec![0.0; 10];
        let ticks = contiguous_ticks(9, 100.0);
        assert!(Recording::new(&data, &ticks, 100.0).check().is_err());
        let ticks = contiguous_ticks(10, 100.0);
        assert!(Recording::new(&data, &ticks, 0.0).check().is_err());
        assert!(Recording::new(&data, &ticks, 100.0).check().is_ok());
    }
}
