use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What each interval is measured against.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntervalMode {
    PreviousNote,
    FirstNote,
}

/// How a sung melody is judged: by absolute pitch around the reference, or by
/// one of the interval representations.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceMode {
    PitchMode,
    PreviousNote,
    FirstNote,
}

impl ReferenceMode {
    pub fn interval_mode(self) -> Option<IntervalMode> {
        match self {
            ReferenceMode::PitchMode => None,
            ReferenceMode::PreviousNote => Some(IntervalMode::PreviousNote),
            ReferenceMode::FirstNote => Some(IntervalMode::FirstNote),
        }
    }
}

impl FromStr for IntervalMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "previous_note" => Ok(IntervalMode::PreviousNote),
            "first_note" => Ok(IntervalMode::FirstNote),
            _ => Err(ConfigError(format!("Unknown interval mode: {}", s))),
        }
    }
}

impl FromStr for ReferenceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pitch_mode" => Ok(ReferenceMode::PitchMode),
            "previous_note" => Ok(ReferenceMode::PreviousNote),
            "first_note" => Ok(ReferenceMode::FirstNote),
            _ => Err(ConfigError(format!("Unknown reference mode: {}", s))),
        }
    }
}

/// N pitches give N-1 intervals; empty and single-note input give none.
pub fn to_intervals(pitches: &[f64], mode: IntervalMode) -> Vec<f64> {
    match mode {
        IntervalMode::PreviousNote => pitches.windows(2).map(|w| w[1] - w[0]).collect(),
        IntervalMode::FirstNote => match pitches.split_first() {
            Some((first, rest)) => rest.iter().map(|p| p - first).collect(),
            None => Vec::new(),
        },
    }
}

pub fn to_intervals2reference(pitches: &[f64], reference_pitch: f64) -> Vec<f64> {
    pitches.iter().map(|p| p - reference_pitch).collect()
}

/// Inverse of [`to_intervals`]. The first pitch is always `reference_pitch`.
pub fn from_intervals(intervals: &[f64], reference_pitch: f64, mode: IntervalMode) -> Vec<f64> {
    let mut pitches = Vec::with_capacity(intervals.len() + 1);
    pitches.push(reference_pitch);
    match mode {
        IntervalMode::PreviousNote => {
            let mut current = reference_pitch;
            for interval in intervals {
                current += interval;
                pitches.push(current);
            }
        }
        IntervalMode::FirstNote => {
            pitches.extend(intervals.iter().map(|i| reference_pitch + i));
        }
    }
    pitches
}

/// Highest minus lowest pitch; 0 for an empty melody.
pub fn pitch_range(pitches: &[f64]) -> f64 {
    if pitches.is_empty() {
        return 0.0;
    }
    let max = pitches.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = pitches.iter().cloned().fold(f64::INFINITY, f64::min);
    max - min
}
