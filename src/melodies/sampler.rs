use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, Result, SamplingError};
use crate::melodies::intervals::{from_intervals, pitch_range, IntervalMode};
use crate::rng::RandomSource;

/// Shape of the per-note distribution inside the allowed pitch window.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PitchDistribution {
    /// Continuous uniform on the window.
    Uniform,
    /// Integer semitones inside the window, each equally likely.
    Discrete,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SamplingPolicy {
    /// No two pitches of one melody may be closer than this (semitones).
    pub min_interval: f64,
    /// Draws allowed per note (or per interval sequence) before giving up.
    pub max_attempts: u32,
    pub distribution: PitchDistribution,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        SamplingPolicy {
            min_interval: 1.0,
            max_attempts: 1000,
            distribution: PitchDistribution::Uniform,
        }
    }
}

impl SamplingPolicy {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.min_interval.is_finite() || self.min_interval < 0.0 {
            return Err(ConfigError(format!(
                "min_interval must be a non-negative number, got {}",
                self.min_interval
            )));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError("max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn check_spread(name: &str, value: f64) -> std::result::Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Largest magnitude at which every whole semitone is still a distinct f64.
const MAX_WHOLE_SEMITONE: f64 = 9_007_199_254_740_992.0;

fn whole_semitone_bound(name: &str, value: f64) -> std::result::Result<i64, ConfigError> {
    if value.abs() > MAX_WHOLE_SEMITONE {
        return Err(ConfigError(format!(
            "{} is too large for whole-semitone sampling: {}",
            name, value
        )));
    }
    Ok(value as i64)
}

/// Draw a reference pitch uniformly from [mean - width, mean + width].
pub fn sample_reference_pitch(
    mean: f64,
    width: f64,
    rng: &mut impl RandomSource,
) -> std::result::Result<f64, ConfigError> {
    if !mean.is_finite() {
        return Err(ConfigError(format!("roving mean must be finite, got {}", mean)));
    }
    check_spread("roving width", width)?;
    Ok(rng.uniform(mean - width, mean + width))
}

/// Draw `num_pitches` pitches within `max_interval2reference` of the
/// reference, keeping every pair at least `policy.min_interval` apart.
pub fn sample_absolute_pitches(
    reference_pitch: f64,
    max_interval2reference: f64,
    num_pitches: usize,
    policy: &SamplingPolicy,
    rng: &mut impl RandomSource,
) -> Result<Vec<f64>> {
    if !reference_pitch.is_finite() {
        return Err(ConfigError(format!(
            "reference pitch must be finite, got {}",
            reference_pitch
        ))
        .into());
    }
    check_spread("max_interval2reference", max_interval2reference)?;
    policy.validate()?;

    let low = reference_pitch - max_interval2reference;
    let high = reference_pitch + max_interval2reference;
    let (int_low, int_high) = match policy.distribution {
        PitchDistribution::Uniform => (0, 0),
        PitchDistribution::Discrete => (
            whole_semitone_bound("lowest pitch", low.ceil())?,
            whole_semitone_bound("highest pitch", high.floor())?,
        ),
    };
    if policy.distribution == PitchDistribution::Discrete && int_low > int_high && num_pitches > 0 {
        return Err(ConfigError(format!(
            "no whole semitone lies within [{}, {}]",
            low, high
        ))
        .into());
    }

    let mut pitches: Vec<f64> = Vec::with_capacity(num_pitches);
    for index in 0..num_pitches {
        let mut placed = None;
        for _ in 0..policy.max_attempts {
            let candidate = match policy.distribution {
                PitchDistribution::Uniform => rng.uniform(low, high),
                PitchDistribution::Discrete => rng.uniform_int(int_low, int_high) as f64,
            };
            if pitches
                .iter()
                .all(|p| (p - candidate).abs() >= policy.min_interval)
            {
                placed = Some(candidate);
                break;
            }
        }
        match placed {
            Some(pitch) => pitches.push(pitch),
            None => {
                warn!(
                    index,
                    num_pitches,
                    reference_pitch,
                    max_interval2reference,
                    min_interval = policy.min_interval,
                    "pitch sampling ran out of attempts"
                );
                return Err(SamplingError::PitchBudgetExhausted {
                    index,
                    num_pitches,
                    attempts: policy.max_attempts,
                    reference_pitch,
                    max_interval2reference,
                }
                .into());
            }
        }
    }
    Ok(pitches)
}

/// Draw intervals no larger than `max_interval_size` whose implied melody spans
/// at most `max_melody_pitch_range`. Whole sequences are redrawn on rejection.
pub fn sample_interval_sequence(
    num_intervals: usize,
    max_interval_size: f64,
    max_melody_pitch_range: f64,
    discrete: bool,
    mode: IntervalMode,
    max_attempts: u32,
    rng: &mut impl RandomSource,
) -> Result<Vec<f64>> {
    check_spread("max_interval_size", max_interval_size)?;
    check_spread("max_melody_pitch_range", max_melody_pitch_range)?;
    if max_attempts == 0 {
        return Err(ConfigError("max_attempts must be at least 1".to_string()).into());
    }

    let whole = if discrete {
        whole_semitone_bound("max_interval_size", max_interval_size.floor())?
    } else {
        0
    };
    for _ in 0..max_attempts {
        let intervals: Vec<f64> = (0..num_intervals)
            .map(|_| {
                if discrete {
                    rng.uniform_int(-whole, whole) as f64
                } else {
                    rng.uniform(-max_interval_size, max_interval_size)
                }
            })
            .collect();
        if pitch_range(&from_intervals(&intervals, 0.0, mode)) <= max_melody_pitch_range {
            return Ok(intervals);
        }
    }

    warn!(num_intervals, max_melody_pitch_range, "interval sampling ran out of attempts");
    Err(SamplingError::IntervalBudgetExhausted {
        num_intervals,
        attempts: max_attempts,
    }
    .into())
}

const CALIBRATION_NUM_INTERVALS: usize = 99;
const CALIBRATION_MAX_INTERVAL: f64 = 8.5;
const CALIBRATION_MAX_RANGE: f64 = 99.0;
const CALIBRATION_MEAN: f64 = 55.0;
const CALIBRATION_WIDTH: f64 = 2.5;

/// Long free melody played while the participant sets their volume.
pub fn calibration_melody(rng: &mut impl RandomSource) -> Result<Vec<f64>> {
    let intervals = sample_interval_sequence(
        CALIBRATION_NUM_INTERVALS,
        CALIBRATION_MAX_INTERVAL,
        CALIBRATION_MAX_RANGE,
        false,
        IntervalMode::FirstNote,
        SamplingPolicy::default().max_attempts,
        rng,
    )?;
    let reference_pitch = sample_reference_pitch(CALIBRATION_MEAN, CALIBRATION_WIDTH, rng)?;
    Ok(from_intervals(&intervals, reference_pitch, IntervalMode::FirstNote))
}
