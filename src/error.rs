use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Invalid constraint combination. Surfaced before any trial runs.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplingError {
    #[error(
        "could not place pitch {index} of {num_pitches} after {attempts} attempts \
         (reference {reference_pitch}, max interval to reference {max_interval2reference})"
    )]
    PitchBudgetExhausted {
        index: usize,
        num_pitches: usize,
        attempts: u32,
        reference_pitch: f64,
        max_interval2reference: f64,
    },

    #[error("could not draw {num_intervals} intervals within the range limit after {attempts} attempts")]
    IntervalBudgetExhausted { num_intervals: usize, attempts: u32 },
}

/// Failure of the pitch-track extractor. Never crosses the trial boundary:
/// the analyzer turns it into a failed `AnalysisResult`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("audio could not be read: {0}")]
    Unreadable(String),

    #[error("no voice detected in recording")]
    NoVoice,

    #[error("note {index} has no usable pitch estimate")]
    InvalidMeasurement { index: usize },

    #[error("analysis was cancelled")]
    Cancelled,

    #[error("extractor failed: {0}")]
    Extractor(String),
}

/// Internal contract violation inside the scorer. Programmer error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("{what}: expected length {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{what} contains non-finite values")]
    NonFinite { what: &'static str },
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot move trial from {from} to {to}")]
pub struct LifecycleError {
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Sampling error: {0}")]
    Sampling(#[from] SamplingError),

    #[error("Scoring error: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
