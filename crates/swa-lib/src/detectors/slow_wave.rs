use crate::{
    config::{Anchor, Baseline, Polarity, SlowWaveConfig, WaveKind},
    error::{Result, SlowWaveError},
    metrics::{
        stats::{mean, median},
        summary::SlowWaveSummary,
    },
    phase::membership_map,
    signal::{ticks_to_sec, Discontinuity, Recording, SampleInterval, TickInterval},
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// An extremum inside a wave.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub amplitude: f64,
    pub sample: usize,
    pub tick: u64,
}

/// A detected slow oscillation bounded by two consecutive anchoring zero crossings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowWave {
    pub kind: WaveKind,
    pub polarity: Polarity,
    pub samples: SampleInterval,
    pub ticks: TickInterval,
    pub down: Peak,
    pub up: Peak,
    /// Mid crossing separating the negative and positive half-waves.
    pub zero_crossing: usize,
    pub zero_crossing_tick: u64,
    /// Normalised phase (degrees) of every sample in `samples`; empty until annotated.
    pub phase: Vec<f64>,
}

impl SlowWave {
    pub fn peak_to_peak(&self) -> f64 {
        self.up.amplitude - self.down.amplitude
    }

    pub fn duration_sec(&self) -> f64 {
        self.ticks.duration_sec()
    }

    /// Duration of the half-wave below zero.
    pub fn negative_duration_sec(&self) -> f64 {
        match self.polarity {
            Polarity::PosToNeg => span_sec(self.ticks.start, self.zero_crossing_tick),
            Polarity::NegToPos => span_sec(self.zero_crossing_tick, self.ticks.stop),
        }
    }

    /// Duration of the half-wave above zero.
    pub fn positive_duration_sec(&self) -> f64 {
        match self.polarity {
            Polarity::PosToNeg => span_sec(self.zero_crossing_tick, self.ticks.stop),
            Polarity::NegToPos => span_sec(self.ticks.start, self.zero_crossing_tick),
        }
    }

    /// Down-going slope into the negative peak (uV/s).
    pub fn slope_neg1(&self) -> Option<f64> {
        if !self.kind.has_negative_slopes() {
            return None;
        }
        let from = match self.polarity {
            Polarity::PosToNeg => self.ticks.start,
            Polarity::NegToPos => self.zero_crossing_tick,
        };
        slope(self.down.amplitude, from, self.down.tick)
    }

    /// Up-going slope out of the negative peak (uV/s).
    pub fn slope_neg2(&self) -> Option<f64> {
        if !self.kind.has_negative_slopes() {
            return None;
        }
        let to = match self.polarity {
            Polarity::PosToNeg => self.zero_crossing_tick,
            Polarity::NegToPos => self.ticks.stop,
        };
        slope(-self.down.amplitude, self.down.tick, to)
    }

    /// Up-going slope into the positive peak (uV/s).
    pub fn slope_pos1(&self) -> Option<f64> {
        if !self.kind.has_positive_slopes() {
            return None;
        }
        let from = match self.polarity {
            Polarity::PosToNeg => self.zero_crossing_tick,
            Polarity::NegToPos => self.ticks.start,
        };
        slope(self.up.amplitude, from, self.up.tick)
    }

    /// Down-going slope out of the positive peak (uV/s).
    pub fn slope_pos2(&self) -> Option<f64> {
        if !self.kind.has_positive_slopes() {
            return None;
        }
        let to = match self.polarity {
            Polarity::PosToNeg => self.ticks.stop,
            Polarity::NegToPos => self.zero_crossing_tick,
        };
        slope(-self.up.amplitude, self.up.tick, to)
    }

    /// Sample a time-locked window is centred on.
    pub fn anchor_sample(&self, anchor: Anchor) -> usize {
        match anchor {
            Anchor::Onset => self.samples.start,
            Anchor::NegativePeak => self.down.sample,
            Anchor::PositivePeak => self.up.sample,
        }
    }
}

fn span_sec(from: u64, to: u64) -> f64 {
    ticks_to_sec(to.saturating_sub(from))
}

fn slope(delta: f64, from: u64, to: u64) -> Option<f64> {
    if to <= from {
        return None;
    }
    Some(delta / ticks_to_sec(to - from))
}

/// Negative-peak and peak-to-peak amplitude pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Amplitudes {
    pub neg_peak: f64,
    pub peak_to_peak: f64,
}

fn is_anchor_crossing(prev: f64, cur: f64, polarity: Polarity) -> bool {
    match polarity {
        Polarity::PosToNeg => cur < 0.0 && prev >= 0.0,
        Polarity::NegToPos => cur >= 0.0 && prev < 0.0,
    }
}

/// Indices `i` where the trace crosses zero with the given polarity between `i - 1` and `i`.
pub fn zero_crossings(x: &[f64], polarity: Polarity) -> Vec<usize> {
    (1..x.len())
        .filter(|&i| is_anchor_crossing(x[i - 1], x[i], polarity))
        .collect()
}

/// Pair consecutive crossings into candidate intervals, dropping pairs that span a
/// gap or fall outside the whole-wave duration bounds.
pub fn segment(
    rec: &Recording<'_>,
    crossings: &[usize],
    disc: &impl Discontinuity,
    cfg: &SlowWaveConfig,
) -> Vec<SampleInterval> {
    let mut out = Vec::new();
    for pair in crossings.windows(2) {
        let (start, stop) = (pair[0], pair[1]);
        if disc.spans_gap(start, stop) {
            continue;
        }
        let t = span_sec(rec.ticks[start], rec.ticks[stop]);
        if cfg.t_lwr > 0.0 && (t < cfg.t_lwr || t > cfg.t_upr) {
            continue;
        }
        out.push(SampleInterval { start, stop });
    }
    out
}

/// Locate peaks and the mid crossing of a candidate. `Ok(None)` when the negative
/// half-wave duration bound rejects it.
pub fn extract(
    rec: &Recording<'_>,
    interval: SampleInterval,
    cfg: &SlowWaveConfig,
) -> Result<Option<SlowWave>> {
    let x = rec.filtered;
    let tp = rec.ticks;
    let (mut xi, mut yi) = (interval.start, interval.start);
    for j in interval.start..interval.stop {
        if x[j] < x[xi] {
            xi = j;
        }
        if x[j] > x[yi] {
            yi = j;
        }
    }

    let (peak1, peak2) = if xi < yi { (xi, yi) } else { (yi, xi) };
    // the mid crossing has the opposite sense to the anchoring crossings
    let mid = match cfg.polarity {
        Polarity::PosToNeg => Polarity::NegToPos,
        Polarity::NegToPos => Polarity::PosToNeg,
    };
    let zc = (peak1 + 1..=peak2)
        .filter(|&j| is_anchor_crossing(x[j - 1], x[j], mid))
        .last()
        .ok_or_else(|| {
            SlowWaveError::Internal(format!(
                "no mid zero crossing between samples {peak1} and {peak2} of wave {}-{}",
                interval.start, interval.stop
            ))
        })?;

    let wave = SlowWave {
        kind: cfg.kind,
        polarity: cfg.polarity,
        samples: interval,
        ticks: TickInterval::new(tp[interval.start], tp[interval.stop]),
        down: Peak {
            amplitude: x[xi],
            sample: xi,
            tick: tp[xi],
        },
        up: Peak {
            amplitude: x[yi],
            sample: yi,
            tick: tp[yi],
        },
        zero_crossing: zc,
        zero_crossing_tick: tp[zc],
        phase: Vec::new(),
    };

    if cfg.t_neg_lwr > 0.0 {
        let t = wave.negative_duration_sec();
        if t < cfg.t_neg_lwr || t > cfg.t_neg_upr {
            return Ok(None);
        }
    }
    Ok(Some(wave))
}

/// Baseline amplitudes over all candidates and the thresholds derived from them.
pub fn adaptive_thresholds(
    candidates: &[SlowWave],
    cfg: &SlowWaveConfig,
) -> (Amplitudes, Amplitudes) {
    let x: Vec<f64> = candidates.iter().map(|w| w.down.amplitude).collect();
    let p2p: Vec<f64> = candidates.iter().map(SlowWave::peak_to_peak).collect();
    let central = match cfg.baseline {
        Baseline::Mean => mean,
        Baseline::Median => median,
    };
    let baseline = Amplitudes {
        neg_peak: central(&x),
        peak_to_peak: central(&p2p),
    };
    let thresholds = Amplitudes {
        neg_peak: baseline.neg_peak * cfg.thr,
        peak_to_peak: baseline.peak_to_peak * cfg.thr,
    };
    (baseline, thresholds)
}

/// Relative and absolute acceptance criteria; all configured ones must hold.
pub fn accepts(wave: &SlowWave, cfg: &SlowWaveConfig, thresholds: &Amplitudes) -> bool {
    let p2p = wave.peak_to_peak();
    (cfg.thr == 0.0 || wave.down.amplitude <= thresholds.neg_peak)
        && (cfg.thr == 0.0 || p2p >= thresholds.peak_to_peak)
        && (cfg.uv_neg == 0.0 || wave.down.amplitude <= cfg.uv_neg)
        && (cfg.uv_p2p == 0.0 || p2p >= cfg.uv_p2p)
}

/// Detector session for a single channel: accepted waves plus everything derived
/// from them.
#[derive(Debug, Clone)]
pub struct SlowWaves {
    pub(crate) config: SlowWaveConfig,
    pub(crate) sample_rate: f64,
    pub(crate) duration_sec: f64,
    pub(crate) crossings: usize,
    pub(crate) candidates: usize,
    pub(crate) baseline: Amplitudes,
    pub(crate) thresholds: Amplitudes,
    pub(crate) waves: Vec<SlowWave>,
    pub(crate) summary: SlowWaveSummary,
    pub(crate) ticks: Vec<u64>,
    pub(crate) phase: Option<Vec<f64>>,
    pub(crate) membership: Vec<Option<usize>>,
}

impl SlowWaves {
    /// Run segmentation, extraction and thresholding over a filtered trace.
    pub fn detect(
        rec: &Recording<'_>,
        disc: &impl Discontinuity,
        cfg: &SlowWaveConfig,
    ) -> Result<Self> {
        cfg.validate()?;
        rec.check()?;

        info!(
            "detecting slow waves: {}-{}Hz, {:?} waves from {:?} crossings",
            cfg.f_lwr, cfg.f_upr, cfg.kind, cfg.polarity
        );
        if cfg.t_lwr > 0.0 {
            debug!("duration {}-{}s", cfg.t_lwr, cfg.t_upr);
        }
        if cfg.t_neg_lwr > 0.0 {
            debug!("negative half-wave duration {}-{}s", cfg.t_neg_lwr, cfg.t_neg_upr);
        }
        if cfg.thr > 0.0 {
            debug!("relative threshold {} ({:?} baseline)", cfg.thr, cfg.baseline);
        }
        if cfg.uv_neg < 0.0 || cfg.uv_p2p > 0.0 {
            debug!(
                "absolute thresholds {} uV negative peak, {} uV peak-to-peak",
                cfg.uv_neg, cfg.uv_p2p
            );
        }

        let crossings = zero_crossings(rec.filtered, cfg.polarity);
        let intervals = segment(rec, &crossings, disc, cfg);
        let mut candidates = Vec::with_capacity(intervals.len());
        for interval in intervals {
            if let Some(wave) = extract(rec, interval, cfg)? {
                candidates.push(wave);
            }
        }

        let (baseline, thresholds) = adaptive_thresholds(&candidates, cfg);
        let n_candidates = candidates.len();
        let waves: Vec<SlowWave> = candidates
            .into_iter()
            .filter(|w| accepts(w, cfg, &thresholds))
            .collect();

        let duration_sec = rec.duration_sec();
        let membership = membership_map(rec.len(), &waves);
        let summary = SlowWaveSummary::from_waves(&waves, duration_sec);
        info!(
            "{} zero crossings, {} candidates, of which {} slow waves met criteria",
            crossings.len(),
            n_candidates,
            waves.len()
        );
        if cfg.thr > 0.0 {
            info!(
                "relative thresholds (<x, >p2p) {} {}",
                thresholds.neg_peak, thresholds.peak_to_peak
            );
        }

        Ok(Self {
            config: cfg.clone(),
            sample_rate: rec.sample_rate,
            duration_sec,
            crossings: crossings.len(),
            candidates: n_candidates,
            baseline,
            thresholds,
            waves,
            summary,
            ticks: rec.ticks.to_vec(),
            phase: None,
            membership,
        })
    }

    pub fn waves(&self) -> &[SlowWave] {
        &self.waves
    }

    pub fn len(&self) -> usize {
        self.waves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    pub fn config(&self) -> &SlowWaveConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn duration_sec(&self) -> f64 {
        self.duration_sec
    }

    /// Number of anchoring zero crossings found in the trace.
    pub fn crossing_count(&self) -> usize {
        self.crossings
    }

    /// Candidates that survived segmentation and the duration bounds.
    pub fn candidate_count(&self) -> usize {
        self.candidates
    }

    /// Central tendency of the candidates' amplitudes (`avg_x`, `avg_yminusx`).
    pub fn baseline(&self) -> Amplitudes {
        self.baseline
    }

    /// Relative acceptance thresholds (`th_x`, `th_yminusx`).
    pub fn thresholds(&self) -> Amplitudes {
        self.thresholds
    }

    pub fn summary(&self) -> &SlowWaveSummary {
        &self.summary
    }

    pub fn ticks(&self) -> &[u64] {
        &self.ticks
    }
}
