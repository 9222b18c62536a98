pub mod config;
pub mod detectors;
pub mod error;
pub mod locking;
pub mod metrics;
pub mod phase;
pub mod signal;

#[cfg(test)]
mod fixtures;

pub use config::*;
pub use detectors::slow_wave::{SlowWave, SlowWaves};
pub use error::{Result, SlowWaveError};
pub use locking::*;
pub use metrics::summary::{SlowWaveSummary, WaveStats};
pub use phase::{Nearest, PhaseUnit, WaveSample};
pub use signal::*;
