use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlowWaveError {
    /// Rejected configuration; raised before any detection work starts.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Inputs that do not line up (lengths, sample rates).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A segmentation or accumulation invariant was broken; the run is aborted.
    #[error("internal consistency failure: {0}")]
    Internal(String),
    #[error("slow waves have not been phase-annotated")]
    PhaseNotAnnotated,
    #[error("transform failed: {0}")]
    Transform(String),
}

pub type Result<T> = std::result::Result<T, SlowWaveError>;
