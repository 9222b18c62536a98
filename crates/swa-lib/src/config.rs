use crate::error::SlowWaveError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which zero crossings bound a wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Waves run from one positive-to-negative crossing to the next.
    #[default]
    PosToNeg,
    /// Waves run from one negative-to-positive crossing to the next.
    NegToPos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveKind {
    #[default]
    Full,
    Half,
    NegativeHalf,
    PositiveHalf,
}

impl WaveKind {
    pub fn has_negative_slopes(self) -> bool {
        matches!(self, WaveKind::Full | WaveKind::NegativeHalf)
    }

    pub fn has_positive_slopes(self) -> bool {
        matches!(self, WaveKind::Full | WaveKind::PositiveHalf)
    }
}

/// Central tendency used for the adaptive thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Baseline {
    Mean,
    #[default]
    Median,
}

/// Sample that a time-locked window is centred on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Onset,
    #[default]
    NegativePeak,
    PositivePeak,
}

impl std::str::FromStr for Anchor {
    type Err = SlowWaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onset" => Ok(Anchor::Onset),
            "neg" | "negative" | "negative_peak" | "negative-peak" => Ok(Anchor::NegativePeak),
            "pos" | "positive" | "positive_peak" | "positive-peak" => Ok(Anchor::PositivePeak),
            other => Err(SlowWaveError::Config(format!("unknown anchor rule '{other}'"))),
        }
    }
}

/// Detection parameters. Defaults follow Latchoumane et al. (2017).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlowWaveConfig {
    /// Relative threshold multiplier; 0 disables relative filtering.
    pub thr: f64,
    /// Band handed to the upstream band-pass filter (Hz). Not interpreted here.
    pub f_lwr: f64,
    pub f_upr: f64,
    /// Whole-wave duration bounds (seconds); `t_lwr == 0` disables the check.
    pub t_lwr: f64,
    pub t_upr: f64,
    /// Negative half-wave duration bounds (seconds); `t_neg_lwr == 0` disables the check.
    pub t_neg_lwr: f64,
    pub t_neg_upr: f64,
    /// Absolute bound on the negative peak (must be <= 0); 0 disables it.
    pub uv_neg: f64,
    /// Absolute bound on peak-to-peak amplitude (must be >= 0); 0 disables it.
    pub uv_p2p: f64,
    pub polarity: Polarity,
    pub kind: WaveKind,
    pub baseline: Baseline,
}

impl Default for SlowWaveConfig {
    fn default() -> Self {
        Self {
            thr: 0.0,
            f_lwr: 0.2,
            f_upr: 4.5,
            t_lwr: 0.0,
            t_upr: 10.0,
            t_neg_lwr: 0.0,
            t_neg_upr: 10.0,
            uv_neg: 0.0,
            uv_p2p: 0.0,
            polarity: Polarity::PosToNeg,
            kind: WaveKind::Full,
            baseline: Baseline::Median,
        }
    }
}

impl SlowWaveConfig {
    pub fn validate(&self) -> Result<(), SlowWaveError> {
        if self.uv_neg > 0.0 {
            return Err(SlowWaveError::Config(format!(
                "negative-peak bound should be negative, got {}",
                self.uv_neg
            )));
        }
        if self.uv_p2p < 0.0 {
            return Err(SlowWaveError::Config(format!(
                "peak-to-peak bound should be positive, got {}",
                self.uv_p2p
            )));
        }
        if self.thr < 0.0 || !self.thr.is_finite() {
            return Err(SlowWaveError::Config(format!(
                "relative threshold must be a non-negative number, got {}",
                self.thr
            )));
        }
        if self.t_lwr < 0.0 || (self.t_lwr > 0.0 && self.t_upr < self.t_lwr) {
            return Err(SlowWaveError::Config(format!(
                "whole-wave duration bounds {}-{}s are not a valid range",
                self.t_lwr, self.t_upr
            )));
        }
        if self.t_neg_lwr < 0.0 || (self.t_neg_lwr > 0.0 && self.t_neg_upr < self.t_neg_lwr) {
            return Err(SlowWaveError::Config(format!(
                "negative half-wave duration bounds {}-{}s are not a valid range",
                self.t_neg_lwr, self.t_neg_upr
            )));
        }
        if self.f_lwr < 0.0 || self.f_upr <= self.f_lwr {
            return Err(SlowWaveError::Config(format!(
                "frequency band {}-{}Hz is not a valid range",
                self.f_lwr, self.f_upr
            )));
        }
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, SlowWaveError> {
        let cfg: SlowWaveConfig =
            toml::from_str(text).map_err(|e| SlowWaveError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Settings for circular phase binning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseLockConfig {
    pub bins: usize,
}

impl Default for PhaseLockConfig {
    fn default() -> Self {
        Self { bins: 18 }
    }
}

impl PhaseLockConfig {
    pub fn validate(&self) -> Result<(), SlowWaveError> {
        if self.bins == 0 {
            return Err(SlowWaveError::Config(
                "number of phase bins must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Window around each event for time-locked averaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeLockConfig {
    pub anchor: Anchor,
    pub left_sec: f64,
    pub right_sec: f64,
}

impl Default for TimeLockConfig {
    fn default() -> Self {
        Self {
            anchor: Anchor::NegativePeak,
            left_sec: 3.0,
            right_sec: 3.0,
        }
    }
}

impl TimeLockConfig {
    pub fn symmetric(anchor: Anchor, window_sec: f64) -> Self {
        Self {
            anchor,
            left_sec: window_sec,
            right_sec: window_sec,
        }
    }

    pub fn validate(&self) -> Result<(), SlowWaveError> {
        let usable = |s: f64| s >= 0.0 && s.is_finite();
        if !usable(self.left_sec) || !usable(self.right_sec) {
            return Err(SlowWaveError::Config(format!(
                "time-locked window must be finite and non-negative, got -{}/+{}s",
                self.left_sec, self.right_sec
            )));
        }
        Ok(())
    }
}

/// Time-locked wavelet power around each event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    pub anchor: Anchor,
    /// Half-width of the reported window (seconds).
    pub window_sec: f64,
    /// Extra signal fed to the transform on each side and discarded afterwards.
    pub padding_sec: f64,
    pub frequencies: Vec<f64>,
    pub cycles: usize,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            anchor: Anchor::NegativePeak,
            window_sec: 3.0,
            padding_sec: 1.0,
            frequencies: vec![10.0, 11.0, 12.0, 13.0, 14.0],
            cycles: 7,
        }
    }
}

impl SpectralConfig {
    pub fn validate(&self) -> Result<(), SlowWaveError> {
        let usable = |s: f64| s >= 0.0 && s.is_finite();
        if !usable(self.window_sec) || !usable(self.padding_sec) {
            return Err(SlowWaveError::Config(format!(
                "spectral window/padding must be finite and non-negative, got {}/{}s",
                self.window_sec, self.padding_sec
            )));
        }
        if self.frequencies.is_empty() {
            return Err(SlowWaveError::Config(
                "at least one centre frequency is required".into(),
            ));
        }
        if let Some(f) = self.frequencies.iter().find(|f| !(**f > 0.0 && f.is_finite())) {
            return Err(SlowWaveError::Config(format!(
                "centre frequencies must be positive, got {f}"
            )));
        }
        if self.cycles == 0 {
            return Err(SlowWaveError::Config("wavelet cycle count must be positive".into()));
        }
        Ok(())
    }
}

/// Everything an analysis session needs, as one immutable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub detection: SlowWaveConfig,
    pub phase_lock: PhaseLockConfig,
    pub time_lock: TimeLockConfig,
    pub spectral: SpectralConfig,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), SlowWaveError> {
        self.detection.validate()?;
        self.phase_lock.validate()?;
        self.time_lock.validate()?;
        self.spectral.validate()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, SlowWaveError> {
        let cfg: AnalysisConfig =
            toml::from_str(text).map_err(|e| SlowWaveError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Read and validate an analysis configuration from a TOML file.
pub fn load_config(path: &Path) -> anyhow::Result<AnalysisConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    AnalysisConfig::from_toml_str(&text)
        .with_context(|| format!("invalid configuration in {}", path.display()))
}
