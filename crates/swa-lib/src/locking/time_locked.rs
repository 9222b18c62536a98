use crate::{
    config::{Anchor, TimeLockConfig},
    detectors::slow_wave::SlowWaves,
    error::Result,
    locking::{check_rate, finish_means, samples_in, window_len},
    signal::TimeSeries,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Sample-by-sample mean of fixed windows around each wave. Position 0 sits
/// `left` samples before the anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeLockedAverage {
    pub fs: f64,
    pub left: usize,
    pub right: usize,
    pub mean: Vec<f64>,
    pub count: Vec<usize>,
}

impl TimeLockedAverage {
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Offset from the anchor, in samples, of each output position.
    pub fn offsets(&self) -> Vec<i64> {
        (0..self.mean.len())
            .map(|pos| pos as i64 - self.left as i64)
            .collect()
    }

    pub fn offsets_sec(&self) -> Vec<f64> {
        self.offsets()
            .into_iter()
            .map(|o| o as f64 / self.fs)
            .collect()
    }
}

/// Window half-widths in samples of a signal sampled at `fs`.
pub fn window_samples(left_sec: f64, right_sec: f64, fs: f64) -> Result<(usize, usize)> {
    let left = samples_in(left_sec, fs)?;
    let right = samples_in(right_sec, fs)?;
    window_len(&[left, 1, right])?;
    Ok((left, right))
}

/// Average `signal` over `[anchor - left, anchor + right]` for every anchor.
/// Positions falling outside the signal are skipped, leaving their count lower.
pub fn time_locked_sum(
    anchors: &[i64],
    signal: &[f64],
    left: usize,
    right: usize,
) -> Result<(Vec<f64>, Vec<usize>)> {
    let np = window_len(&[left, 1, right])?;
    let mut sum = vec![0.0; np];
    let mut count = vec![0usize; np];
    let n = signal.len() as i64;
    for &anchor in anchors {
        let lower = anchor - left as i64;
        for pos in 0..np {
            let j = lower + pos as i64;
            if j < 0 || j >= n {
                continue;
            }
            sum[pos] += signal[j as usize];
            count[pos] += 1;
        }
    }
    Ok((sum, count))
}

impl SlowWaves {
    /// Anchor samples of every wave expressed in a signal sampled at `fs`.
    pub fn anchors_at(&self, anchor: Anchor, fs: f64) -> Vec<i64> {
        let ratio = fs / self.sample_rate;
        self.waves
            .iter()
            .map(|w| {
                let a = w.anchor_sample(anchor);
                if ratio == 1.0 {
                    a as i64
                } else {
                    (a as f64 * ratio).round() as i64
                }
            })
            .collect()
    }

    /// Time-locked average of an auxiliary signal around each wave.
    pub fn time_locked_average(
        &self,
        aux: &TimeSeries,
        cfg: &TimeLockConfig,
    ) -> Result<TimeLockedAverage> {
        cfg.validate()?;
        check_rate(aux.fs)?;
        let (left, right) = window_samples(cfg.left_sec, cfg.right_sec, aux.fs)?;
        if self.waves.is_empty() {
            return Ok(TimeLockedAverage {
                fs: aux.fs,
                left,
                right,
                mean: Vec::new(),
                count: Vec::new(),
            });
        }
        debug!(
            "time-locked averaging to {:?} within -{}/+{}s",
            cfg.anchor, cfg.left_sec, cfg.right_sec
        );
        let anchors = self.anchors_at(cfg.anchor, aux.fs);
        let (sum, count) = time_locked_sum(&anchors, &aux.data, left, right)?;
        Ok(TimeLockedAverage {
            fs: aux.fs,
            left,
            right,
            mean: finish_means(&sum, &count),
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::SlowWaveConfig,
        error::SlowWaveError,
        fixtures::{assert_close, sine_trace},
        signal::{contiguous_ticks, Continuous, Recording},
    };

    fn session(x: &[f64], fs: f64) -> SlowWaves {
        let ticks = contiguous_ticks(x.len(), fs);
        SlowWaves::detect(
            &Recording::new(x, &ticks, fs),
            &Continuous,
            &SlowWaveConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn zero_width_window_averages_anchor_samples() {
        let x = sine_trace(1.0, 100.0, 4.0, 1.0);
        let sw = session(&x, 100.0);
        let aux = TimeSeries {
            fs: 100.0,
            data: (0..x.len()).map(|i| i as f64).collect(),
        };
        let avg = sw
            .time_locked_average(&aux, &TimeLockConfig::symmetric(Anchor::Onset, 0.0))
            .unwrap();
        assert_eq!(avg.mean.len(), 1);
        // onsets at 50, 150, 250
        assert_close(avg.mean[0], 150.0, 1e-12);
        assert_eq!(avg.count, vec![3]);
    }

    #[test]
    fn window_around_negative_peak_follows_the_trough() {
        let x = sine_trace(1.0, 100.0, 4.0, 1.0);
        let sw = session(&x, 100.0);
        let aux = TimeSeries {
            fs: 100.0,
            data: x.clone(),
        };
        let avg = sw
            .time_locked_average(&aux, &TimeLockConfig::symmetric(Anchor::NegativePeak, 0.5))
            .unwrap();
        assert_eq!(avg.mean.len(), 101);
        assert_eq!(avg.offsets()[0], -50);
        assert_close(avg.mean[50], -1.0, 1e-3);
        assert!(avg.mean[0] > 0.9 && avg.mean[100] > 0.9);
        // the sine is symmetric about its trough, up to the one-sample tie in peak picking
        for k in 1..50 {
            assert_close(avg.mean[50 - k], avg.mean[50 + k], 0.08);
        }
    }

    #[test]
    fn out_of_range_positions_are_not_counted() {
        let x = sine_trace(1.0, 100.0, 3.0, 1.0);
        let sw = session(&x, 100.0);
        let aux = TimeSeries {
            fs: 100.0,
            data: vec![1.0; x.len()],
        };
        let avg = sw
            .time_locked_average(&aux, &TimeLockConfig::symmetric(Anchor::Onset, 1.0))
            .unwrap();
        // onsets at 50 and 150; the window reaches 100 samples back
        assert_eq!(avg.count[0], 1);
        assert_eq!(avg.count[49], 1);
        assert_eq!(avg.count[50], 2);
        assert_eq!(avg.count[200], 2);
        assert_eq!(avg.mean[0], 1.0);

        let short = TimeSeries {
            fs: 100.0,
            data: vec![1.0; 40],
        };
        let avg = sw
            .time_locked_average(&short, &TimeLockConfig::symmetric(Anchor::Onset, 0.0))
            .unwrap();
        assert_eq!(avg.count, vec![0]);
        assert!(avg.mean[0].is_nan());
    }

    #[test]
    fn auxiliary_rate_sets_window_length() {
        let x = sine_trace(1.0, 100.0, 4.0, 1.0);
        let sw = session(&x, 100.0);
        let aux = TimeSeries {
            fs: 200.0,
            data: (0..800).map(|i| i as f64).collect(),
        };
        let avg = sw
            .time_locked_average(&aux, &TimeLockConfig::symmetric(Anchor::Onset, 0.25))
            .unwrap();
        assert_eq!(avg.mean.len(), 101);
        // onsets 50, 150, 250 map to 100, 300, 500 at 200 Hz
        assert_close(avg.mean[50], 300.0, 1e-12);
        assert_close(avg.offsets_sec()[0], -0.25, 1e-12);
    }

    #[test]
    fn negative_window_is_a_config_error() {
        let x = sine_trace(1.0, 100.0, 3.0, 1.0);
        let sw = session(&x, 100.0);
        let aux = TimeSeries {
            fs: 100.0,
            data: x.clone(),
        };
        let cfg = TimeLockConfig {
            anchor: Anchor::PositivePeak,
            left_sec: -1.0,
            right_sec: 1.0,
        };
        assert!(matches!(
            sw.time_locked_average(&aux, &cfg),
            Err(SlowWaveError::Config(_))
        ));
    }

    #[test]
    fn unbounded_windows_fail_before_accumulating() {
        let x = sine_trace(1.0, 100.0, 3.0, 1.0);
        let sw = session(&x, 100.0);
        let aux = TimeSeries {
            fs: 100.0,
            data: x.clone(),
        };
        for window in [1e300, f64::INFINITY, f64::NAN] {
            let cfg = TimeLockConfig::symmetric(Anchor::Onset, window);
            assert!(
                matches!(
                    sw.time_locked_average(&aux, &cfg),
                    Err(SlowWaveError::Config(_))
                ),
                "window {window}"
            );
        }
        assert!(window_samples(1e300, 0.0, 100.0).is_err());
        assert!(time_locked_sum(&[0], &x, usize::MAX, 1).is_err());

        let fast = TimeSeries {
            fs: f64::INFINITY,
            data: x.clone(),
        };
        assert!(matches!(
            sw.time_locked_average(&fast, &TimeLockConfig::default()),
            Err(SlowWaveError::InvalidInput(_))
        ));
    }

    #[test]
    fn no_waves_give_empty_output() {
        let x = sine_trace(1.0, 100.0, 1.0, 1.0);
        let sw = session(&x, 100.0);
        let aux = TimeSeries {
            fs: 100.0,
            data: x.clone(),
        };
        let avg = sw
            .time_locked_average(&aux, &TimeLockConfig::default())
            .unwrap();
        assert!(avg.is_empty());
    }
}
