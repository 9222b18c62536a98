pub mod analytic;

use crate::{
    config::Polarity,
    detectors::slow_wave::{SlowWave, SlowWaves},
    error::{Result, SlowWaveError},
    metrics::stats::wrap_deg,
    signal::ticks_to_sec,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Unit of an externally computed phase trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseUnit {
    Radians,
    Degrees,
}

/// Map analytic-signal phase (0 at positive peaks) to degrees in [0, 360) with 0
/// at the anchoring zero crossing.
pub fn normalize_phase(raw: &[f64], unit: PhaseUnit, polarity: Polarity) -> Vec<f64> {
    let offset = match polarity {
        Polarity::PosToNeg => -90.0,
        Polarity::NegToPos => 90.0,
    };
    raw.iter()
        .map(|&p| {
            let deg = match unit {
                PhaseUnit::Radians => p.to_degrees(),
                PhaseUnit::Degrees => p,
            };
            wrap_deg(deg + offset)
        })
        .collect()
}

/// Per-sample index of the wave covering it, if any.
pub fn membership_map(n: usize, waves: &[SlowWave]) -> Vec<Option<usize>> {
    let mut map = vec![None; n];
    for (idx, w) in waves.iter().enumerate() {
        let stop = w.samples.stop.min(n);
        for slot in &mut map[w.samples.start.min(stop)..stop] {
            *slot = Some(idx);
        }
    }
    map
}

/// Closest wave to a sample and the signed offset to it in seconds (negative when
/// the wave precedes the sample).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Nearest {
    pub wave: usize,
    pub offset_sec: f64,
}

/// Scan backward and forward from `i` for the nearest marked sample. Equal
/// distances resolve to the forward match. Without any marked sample (or for
/// `i` out of range) the result is wave 0 at offset 0.
pub fn nearest(membership: &[Option<usize>], ticks: &[u64], i: usize) -> Nearest {
    let fallback = Nearest {
        wave: 0,
        offset_sec: 0.0,
    };
    if i >= membership.len() || i >= ticks.len() {
        return fallback;
    }
    if let Some(wave) = membership[i] {
        return Nearest {
            wave,
            offset_sec: 0.0,
        };
    }
    let back = (0..i).rev().find_map(|j| {
        membership[j].map(|wave| Nearest {
            wave,
            offset_sec: -ticks_to_sec(ticks[i].saturating_sub(ticks[j])),
        })
    });
    let fwd = (i + 1..membership.len()).find_map(|j| {
        membership[j].map(|wave| Nearest {
            wave,
            offset_sec: ticks_to_sec(ticks[j].saturating_sub(ticks[i])),
        })
    });
    match (back, fwd) {
        (Some(b), Some(f)) => {
            if b.offset_sec.abs() < f.offset_sec.abs() {
                b
            } else {
                f
            }
        }
        (Some(b), None) => b,
        (None, Some(f)) => f,
        (None, None) => fallback,
    }
}

/// One sample of a wave with its filtered value and phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveSample {
    pub offset: usize,
    pub sample: usize,
    pub filtered: f64,
    pub phase: f64,
}

impl SlowWaves {
    /// Attach instantaneous phase to every wave and rebuild the membership map.
    pub fn annotate_phase(&mut self, raw: &[f64], unit: PhaseUnit) -> Result<()> {
        if raw.len() != self.ticks.len() {
            return Err(SlowWaveError::InvalidInput(format!(
                "phase trace has {} samples, detection trace has {}",
                raw.len(),
                self.ticks.len()
            )));
        }
        if let Some(i) = raw.iter().position(|p| !p.is_finite()) {
            return Err(SlowWaveError::InvalidInput(format!(
                "phase trace has a non-finite value at sample {i}"
            )));
        }
        let phase = normalize_phase(raw, unit, self.config.polarity);
        self.membership = membership_map(phase.len(), &self.waves);
        for w in self.waves.iter_mut() {
            w.phase = phase[w.samples.start..w.samples.stop].to_vec();
        }
        self.phase = Some(phase);
        debug!("phase-annotated {} slow waves", self.waves.len());
        Ok(())
    }

    /// Phase-annotate from the filtered trace itself using the Hilbert transform.
    pub fn annotate_phase_from_filtered(&mut self, filtered: &[f64]) -> Result<()> {
        debug!("running Hilbert transform over {} samples", filtered.len());
        let raw = analytic::analytic_phase(filtered)?;
        self.annotate_phase(&raw, PhaseUnit::Radians)
    }

    pub fn is_phase_annotated(&self) -> bool {
        self.phase.is_some()
    }

    /// Normalised phase (degrees) of the whole trace.
    pub fn phase(&self) -> Option<&[f64]> {
        self.phase.as_deref()
    }

    pub fn membership(&self) -> &[Option<usize>] {
        &self.membership
    }

    pub fn nearest(&self, i: usize) -> Nearest {
        nearest(&self.membership, &self.ticks, i)
    }

    /// Filtered value and phase of each sample of one wave.
    pub fn wave_samples(&self, wave: usize, filtered: &[f64]) -> Result<Vec<WaveSample>> {
        let phase = self.phase.as_ref().ok_or(SlowWaveError::PhaseNotAnnotated)?;
        let w = self.waves.get(wave).ok_or_else(|| {
            SlowWaveError::InvalidInput(format!(
                "wave {wave} requested but only {} detected",
                self.waves.len()
            ))
        })?;
        if filtered.len() != phase.len() {
            return Err(SlowWaveError::InvalidInput(format!(
                "filtered trace has {} samples, detection trace has {}",
                filtered.len(),
                phase.len()
            )));
        }
        Ok((w.samples.start..w.samples.stop)
            .enumerate()
            .map(|(offset, sample)| WaveSample {
                offset,
                sample,
                filtered: filtered[sample],
                phase: phase[sample],
            })
            .collect())
    }
}
