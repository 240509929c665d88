// src/error.rs

//! Analysis error types.
//!
//! Every detectable bad-data condition gets its own variant so the caller can
//! render a useful message instead of fitting on garbage. None of these are
//! ever swallowed inside the pipeline; the stages return them through `?`.

use crate::data_input::capture::TestKind;
use thiserror::Error;

/// Result type for pipeline operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Too few samples survive for the secant-slope window.
    #[error("{test}: {samples} samples is not enough to compute acceleration with window {window}; use a smaller window or record a longer run")]
    InsufficientData {
        test: TestKind,
        samples: usize,
        window: usize,
    },

    /// No quasistatic sample exceeded the motion/voltage thresholds.
    #[error("{test}: no sample is above the motion threshold ({threshold} units/s); lower the threshold and check that the encoders are reporting")]
    InsufficientMotion { test: TestKind, threshold: f64 },

    /// The capture file lacks one of the required test runs.
    #[error("capture is missing the \"{0}\" test")]
    MissingTest(TestKind),

    /// A logged row does not have the expected channel layout.
    #[error("{test}: row {row} has {actual} channels, expected {expected}")]
    ChannelMismatch {
        test: TestKind,
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Track-width capture recorded no rotation.
    #[error("track-width capture shows no change in gyro angle; is the gyro configured correctly?")]
    NoGyroMotion,

    /// Bryson weights require strictly positive tolerances.
    #[error("error/effort tolerances must be strictly positive, got {0}")]
    NonPositiveTolerance(f64),

    /// The LQR solve could not produce a gain.
    #[error("feedback gain computation failed: {0}")]
    GainSolveFailed(String),

    /// The least-squares solve failed.
    #[error("regression failed: {0}")]
    FitFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("capture JSON could not be parsed: {0}")]
    Json(#[from] serde_json::Error),
}
