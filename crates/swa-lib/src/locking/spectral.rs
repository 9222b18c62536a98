use crate::{
    config::SpectralConfig,
    detectors::slow_wave::SlowWaves,
    error::{Result, SlowWaveError},
    locking::{check_rate, finish_means, samples_in, window_len},
    metrics::stats::circular_mean_deg,
    signal::TimeSeries,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Time/frequency decomposition consumed by the spectral aggregator: one power
/// row per centre frequency, each as long as `signal`.
pub trait TimeFrequency {
    fn power(
        &self,
        signal: &[f64],
        sample_rate: f64,
        frequencies: &[f64],
        cycles: usize,
    ) -> Result<Vec<Vec<f64>>>;
}

/// Wavelet power, raw signal and phase averaged over windows around each wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralAverage {
    pub fs: f64,
    pub frequencies: Vec<f64>,
    /// Samples on each side of the anchor.
    pub half_width: usize,
    pub events: usize,
    pub signal_mean: Vec<f64>,
    /// Circular mean (degrees); `None` where no sample landed or the angles cancel.
    pub phase_mean: Vec<Option<f64>>,
    pub count: Vec<usize>,
    /// `power[f][pos]`, averaged over all events.
    pub power: Vec<Vec<f64>>,
}

impl SpectralAverage {
    pub fn is_empty(&self) -> bool {
        self.events == 0
    }
}

impl SlowWaves {
    /// Time-locked wavelet analysis of `aux` around every wave.
    pub fn time_locked_spectral(
        &self,
        aux: &TimeSeries,
        cfg: &SpectralConfig,
        tf: &impl TimeFrequency,
    ) -> Result<SpectralAverage> {
        cfg.validate()?;
        let phase = self.phase.as_ref().ok_or(SlowWaveError::PhaseNotAnnotated)?;
        check_rate(aux.fs)?;

        let half_width = samples_in(cfg.window_sec, aux.fs)?;
        let padding = samples_in(cfg.padding_sec, aux.fs)?;
        let npoints = window_len(&[half_width, 1, half_width])?;
        let total = window_len(&[padding, npoints, padding])?;
        let nf = cfg.frequencies.len();

        let mut sig_sum = vec![0.0; npoints];
        let mut count = vec![0usize; npoints];
        let mut angles: Vec<Vec<f64>> = vec![Vec::new(); npoints];
        let mut power = vec![vec![0.0; npoints]; nf];

        info!(
            "time-locked spectral analysis of {} slow waves at {:?}Hz",
            self.waves.len(),
            cfg.frequencies
        );

        let n = aux.data.len() as i64;
        let to_detect = self.sample_rate / aux.fs;
        let anchors = self.anchors_at(cfg.anchor, aux.fs);
        for (i, &centre) in anchors.iter().enumerate() {
            debug!("considering slow wave {} of {}", i + 1, anchors.len());

            // zero-filled beyond the signal, always `total` long
            let lower = centre - (half_width + padding) as i64;
            let x: Vec<f64> = (0..total as i64)
                .map(|k| {
                    let j = lower + k;
                    if j < 0 || j >= n {
                        0.0
                    } else {
                        aux.data[j as usize]
                    }
                })
                .collect();

            let lower = centre - half_width as i64;
            for pos in 0..npoints {
                let j = lower + pos as i64;
                if j < 0 || j >= n {
                    continue;
                }
                sig_sum[pos] += aux.data[j as usize];
                count[pos] += 1;
                let d = (j as f64 * to_detect).round() as usize;
                if let Some(&ph) = phase.get(d) {
                    angles[pos].push(ph);
                }
            }

            let rows = tf.power(&x, aux.fs, &cfg.frequencies, cfg.cycles)?;
            if rows.len() != nf {
                return Err(SlowWaveError::Internal(format!(
                    "time/frequency transform returned {} frequencies, expected {}",
                    rows.len(),
                    nf
                )));
            }
            for (acc, row) in power.iter_mut().zip(&rows) {
                if row.len() != total {
                    return Err(SlowWaveError::Internal(format!(
                        "time/frequency transform returned {} points, expected {}",
                        row.len(),
                        total
                    )));
                }
                // padding is dropped
                for (a, v) in acc.iter_mut().zip(&row[padding..padding + npoints]) {
                    *a += v;
                }
            }
        }

        let events = anchors.len();
        if events > 0 {
            for row in power.iter_mut() {
                for v in row.iter_mut() {
                    *v /= events as f64;
                }
            }
        }

        Ok(SpectralAverage {
            fs: aux.fs,
            frequencies: cfg.frequencies.clone(),
            half_width,
            events,
            signal_mean: finish_means(&sig_sum, &count),
            phase_mean: angles.iter().map(|a| circular_mean_deg(a)).collect(),
            count,
            power,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Anchor, SlowWaveConfig, TimeLockConfig},
        fixtures::{assert_close, sine_trace},
        signal::{contiguous_ticks, Continuous, Recording},
    };

    /// Squared signal scaled by the frequency, standing in for wavelet power.
    struct Squared;

    impl TimeFrequency for Squared {
        fn power(
            &self,
            signal: &[f64],
            _sample_rate: f64,
            frequencies: &[f64],
            _cycles: usize,
        ) -> Result<Vec<Vec<f64>>> {
            Ok(frequencies
                .iter()
                .map(|f| signal.iter().map(|v| f * v * v).collect())
                .collect())
        }
    }

    /// Drops the last sample of every row.
    struct Truncating;

    impl TimeFrequency for Truncating {
        fn power(
            &self,
            signal: &[f64],
            _sample_rate: f64,
            frequencies: &[f64],
            _cycles: usize,
        ) -> Result<Vec<Vec<f64>>> {
            Ok(frequencies
                .iter()
                .map(|_| signal[..signal.len() - 1].to_vec())
                .collect())
        }
    }

    fn annotated(x: &[f64], fs: f64) -> SlowWaves {
        let ticks = contiguous_ticks(x.len(), fs);
        let mut sw = SlowWaves::detect(
            &Recording::new(x, &ticks, fs),
            &Continuous,
            &SlowWaveConfig::default(),
        )
        .unwrap();
        sw.annotate_phase_from_filtered(x).unwrap();
        sw
    }

    fn config() -> SpectralConfig {
        SpectralConfig {
            window_sec: 0.2,
            padding_sec: 0.1,
            frequencies: vec![1.0, 2.0],
            ..SpectralConfig::default()
        }
    }

    #[test]
    fn averages_power_and_signal_over_the_window() {
        let x = sine_trace(1.0, 100.0, 4.0, 1.0);
        let sw = annotated(&x, 100.0);
        let aux = TimeSeries {
            fs: 100.0,
            data: x.clone(),
        };
        let avg = sw.time_locked_spectral(&aux, &config(), &Squared).unwrap();
        assert_eq!(avg.events, 3);
        assert_eq!(avg.signal_mean.len(), 41);
        assert_eq!(avg.power.len(), 2);
        assert_eq!(avg.power[0].len(), 41);
        // centre is the trough
        assert_close(avg.signal_mean[20], -1.0, 1e-3);
        assert_close(avg.power[0][20], 1.0, 2e-3);
        assert_close(avg.power[1][20], 2.0, 2e-3);
        let phase = avg.phase_mean[20].unwrap();
        assert!((phase - 90.0).abs() < 10.0, "trough phase {phase}");

        // the raw-signal mean matches plain time-locked averaging
        let tl = sw
            .time_locked_average(&aux, &TimeLockConfig::symmetric(Anchor::NegativePeak, 0.2))
            .unwrap();
        for (a, b) in avg.signal_mean.iter().zip(&tl.mean) {
            assert_close(*a, *b, 1e-12);
        }
    }

    #[test]
    fn transform_length_mismatch_is_fatal() {
        let x = sine_trace(1.0, 100.0, 3.0, 1.0);
        let sw = annotated(&x, 100.0);
        let aux = TimeSeries {
            fs: 100.0,
            data: x.clone(),
        };
        assert!(matches!(
            sw.time_locked_spectral(&aux, &config(), &Truncating),
            Err(SlowWaveError::Internal(_))
        ));
    }

    #[test]
    fn requires_phase_annotation() {
        let x = sine_trace(1.0, 100.0, 3.0, 1.0);
        let ticks = contiguous_ticks(x.len(), 100.0);
        let sw = SlowWaves::detect(
            &Recording::new(&x, &ticks, 100.0),
            &Continuous,
            &SlowWaveConfig::default(),
        )
        .unwrap();
        let aux = TimeSeries {
            fs: 100.0,
            data: x.clone(),
        };
        assert!(matches!(
            sw.time_locked_spectral(&aux, &config(), &Squared),
            Err(SlowWaveError::PhaseNotAnnotated)
        ));
    }

    #[test]
    fn no_waves_give_empty_output() {
        let x = sine_trace(1.0, 100.0, 1.0, 1.0);
        let sw = annotated(&x, 100.0);
        let aux = TimeSeries {
            fs: 100.0,
            data: x.clone(),
        };
        let avg = sw.time_locked_spectral(&aux, &config(), &Squared).unwrap();
        assert!(avg.is_empty());
        assert!(avg.signal_mean.iter().all(|m| m.is_nan()));
    }

    #[test]
    fn oversized_windows_are_config_errors() {
        let x = sine_trace(1.0, 100.0, 3.0, 1.0);
        let sw = annotated(&x, 100.0);
        let aux = TimeSeries {
            fs: 100.0,
            data: x.clone(),
        };
        let huge = SpectralConfig {
            padding_sec: 1e300,
            ..config()
        };
        // each part fits on its own, the padded total does not
        let long = SpectralConfig {
            window_sec: 1e15,
            padding_sec: 5e15,
            ..config()
        };
        let endless = SpectralConfig {
            window_sec: f64::INFINITY,
            ..config()
        };
        for cfg in [huge, long, endless] {
            assert!(matches!(
                sw.time_locked_spectral(&aux, &cfg, &Squared),
                Err(SlowWaveError::Config(_))
            ));
        }
        let nan_rate = TimeSeries {
            fs: f64::NAN,
            data: x.clone(),
        };
        assert!(matches!(
            sw.time_locked_spectral(&nan_rate, &config(), &Squared),
            Err(SlowWaveError::InvalidInput(_))
        ));
    }
}
