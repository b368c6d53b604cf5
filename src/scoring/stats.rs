use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ScoringError;
use crate::melodies::intervals::pitch_range;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PerformanceStats {
    pub num_sung_pitches: usize,
    pub num_target_pitches: usize,
    pub num_compared_pitches: usize,
    pub num_compared_intervals: usize,
    #[serde(deserialize_with = "nan_from_null")]
    pub mean_abs_pitch_error: f64,
    #[serde(deserialize_with = "nan_from_null")]
    pub mean_abs_interval_error: f64,
    #[serde(deserialize_with = "nan_from_null")]
    pub max_abs_interval_error: f64,
    /// Highest minus lowest sung pitch.
    #[serde(deserialize_with = "nan_from_null")]
    pub melody_pitch_range: f64,
    #[serde(deserialize_with = "nan_from_null")]
    pub target_pitch_range: f64,
    pub pitch_errors: Vec<f64>,
    pub interval_errors: Vec<f64>,
}

/// Undefined metrics are NaN, which JSON writes as `null`.
fn nan_from_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl PerformanceStats {
    /// Scalar metrics by name.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        [
            ("num_sung_pitches", self.num_sung_pitches as f64),
            ("num_target_pitches", self.num_target_pitches as f64),
            ("num_compared_pitches", self.num_compared_pitches as f64),
            ("num_compared_intervals", self.num_compared_intervals as f64),
            ("mean_abs_pitch_error", self.mean_abs_pitch_error),
            ("mean_abs_interval_error", self.mean_abs_interval_error),
            ("max_abs_interval_error", self.max_abs_interval_error),
            ("melody_pitch_range", self.melody_pitch_range),
            ("target_pitch_range", self.target_pitch_range),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
    }
}

fn check_sequence(
    what: &'static str,
    values: &[f64],
    expected_len: Option<usize>,
) -> Result<(), ScoringError> {
    if let Some(expected) = expected_len {
        if values.len() != expected {
            return Err(ScoringError::LengthMismatch {
                what,
                expected,
                actual: values.len(),
            });
        }
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ScoringError::NonFinite { what });
    }
    Ok(())
}

fn abs_errors(sung: &[f64], target: &[f64]) -> Vec<f64> {
    sung.iter().zip(target).map(|(s, t)| (s - t).abs()).collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn range_or_nan(pitches: &[f64]) -> f64 {
    if pitches.is_empty() {
        f64::NAN
    } else {
        pitch_range(pitches)
    }
}

/// Positional comparison up to the shorter sequence. With nothing to compare,
/// every error metric is NaN. Interval sequences must be one shorter than
/// their pitch sequences.
pub fn compute_stats(
    sung_pitches: &[f64],
    target_pitches: &[f64],
    sung_intervals: &[f64],
    target_intervals: &[f64],
) -> Result<PerformanceStats, ScoringError> {
    check_sequence("sung pitches", sung_pitches, None)?;
    check_sequence("target pitches", target_pitches, None)?;
    check_sequence(
        "sung intervals",
        sung_intervals,
        Some(sung_pitches.len().saturating_sub(1)),
    )?;
    check_sequence(
        "target intervals",
        target_intervals,
        Some(target_pitches.len().saturating_sub(1)),
    )?;

    let pitch_errors = abs_errors(sung_pitches, target_pitches);
    let interval_errors = abs_errors(sung_intervals, target_intervals);

    let (mean_abs_pitch_error, mean_abs_interval_error, max_abs_interval_error) =
        if pitch_errors.is_empty() {
            (f64::NAN, f64::NAN, f64::NAN)
        } else if interval_errors.is_empty() {
            (mean(&pitch_errors), 0.0, 0.0)
        } else {
            (
                mean(&pitch_errors),
                mean(&interval_errors),
                interval_errors.iter().cloned().fold(0.0, f64::max),
            )
        };

    Ok(PerformanceStats {
        num_sung_pitches: sung_pitches.len(),
        num_target_pitches: target_pitches.len(),
        num_compared_pitches: pitch_errors.len(),
        num_compared_intervals: interval_errors.len(),
        mean_abs_pitch_error,
        mean_abs_interval_error,
        max_abs_interval_error,
        melody_pitch_range: range_or_nan(sung_pitches),
        target_pitch_range: range_or_nan(target_pitches),
        pitch_errors,
        interval_errors,
    })
}
