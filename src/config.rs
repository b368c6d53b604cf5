use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::melodies::{ReferenceMode, SamplingPolicy};
use crate::scoring::criteria::{ClassifierKind, FailingCriteria};
use crate::transposition::Register;

/// Reference-pitch means per register, in semitones.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RovingMean {
    pub default: f64,
    pub low: f64,
    pub high: f64,
}

impl Default for RovingMean {
    fn default() -> Self {
        RovingMean {
            default: 55.0,
            low: 49.0,
            high: 61.0,
        }
    }
}

impl RovingMean {
    pub fn for_register(&self, register: Option<Register>) -> f64 {
        match register {
            Some(Register::Low) => self.low,
            Some(Register::High) => self.high,
            None => self.default,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct TrialTiming {
    pub melody_duration: f64,
    pub singing_duration: f64,
}

/// Listening time for the prompt and recording time for the response.
pub fn estimate_time_per_trial(
    pitch_duration: f64,
    num_pitches: usize,
    time_after_singing: f64,
) -> TrialTiming {
    let melody_duration = pitch_duration * num_pitches as f64;
    TrialTiming {
        melody_duration,
        singing_duration: melody_duration + time_after_singing,
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ExperimentConfig {
    pub roving_mean: RovingMean,
    pub roving_width: f64,
    pub max_interval2reference: f64,
    pub num_notes: usize,
    pub num_melodies: usize,
    pub reference_mode: ReferenceMode,
    pub classifier: ClassifierKind,
    pub max_interval_size: f64,
    pub max_melody_pitch_range: f64,
    pub max_abs_interval_error_allowed: f64,
    /// Half-width of the allowed band around the reference in pitch mode.
    /// Twice `max_interval2reference` when unset.
    pub pitch_window: Option<f64>,
    pub sampling: SamplingPolicy,
    pub save_plot: bool,
    /// Seconds per synthesized note.
    pub note_duration: f64,
    pub note_silence: f64,
    pub time_after_singing: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            roving_mean: RovingMean::default(),
            roving_width: 2.5,
            max_interval2reference: 10.0,
            num_notes: 3,
            num_melodies: 5,
            reference_mode: ReferenceMode::PitchMode,
            classifier: ClassifierKind::Full,
            max_interval_size: 999.0,
            max_melody_pitch_range: 999.0,
            max_abs_interval_error_allowed: 5.5,
            pitch_window: None,
            sampling: SamplingPolicy::default(),
            save_plot: true,
            note_duration: 0.8,
            note_silence: 0.0,
            time_after_singing: 1.0,
        }
    }
}

fn non_negative(name: &str, value: f64) -> std::result::Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )))
    }
}

impl ExperimentConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ExperimentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.num_notes < 2 {
            return Err(ConfigError(format!(
                "num_notes must be at least 2, got {}",
                self.num_notes
            )));
        }
        let means = [
            self.roving_mean.default,
            self.roving_mean.low,
            self.roving_mean.high,
        ];
        if means.iter().any(|m| !m.is_finite()) {
            return Err(ConfigError("roving means must be finite".to_string()));
        }
        non_negative("roving_width", self.roving_width)?;
        non_negative("max_interval2reference", self.max_interval2reference)?;
        non_negative("max_interval_size", self.max_interval_size)?;
        non_negative("max_melody_pitch_range", self.max_melody_pitch_range)?;
        non_negative(
            "max_abs_interval_error_allowed",
            self.max_abs_interval_error_allowed,
        )?;
        if let Some(window) = self.pitch_window {
            non_negative("pitch_window", window)?;
        }
        non_negative("note_silence", self.note_silence)?;
        non_negative("time_after_singing", self.time_after_singing)?;
        if !(self.note_duration.is_finite() && self.note_duration > 0.0) {
            return Err(ConfigError(format!(
                "note_duration must be positive, got {}",
                self.note_duration
            )));
        }
        self.sampling.validate()
    }

    pub fn pitch_window(&self) -> f64 {
        self.pitch_window
            .unwrap_or(self.max_interval2reference * 2.0)
    }

    /// Thresholds for judging a melody of `num_notes` notes.
    pub fn failing_criteria(&self, num_notes: usize) -> FailingCriteria {
        FailingCriteria {
            kind: self.classifier,
            expected_num_intervals: num_notes.saturating_sub(1),
            reference_mode: self.reference_mode,
            max_interval_size: self.max_interval_size,
            max_melody_pitch_range: self.max_melody_pitch_range,
            max_abs_interval_error_allowed: self.max_abs_interval_error_allowed,
            max_interval2reference_window: self.pitch_window(),
        }
    }

    /// The prompt plays the reference followed by the melody notes.
    pub fn trial_timing(&self) -> TrialTiming {
        estimate_time_per_trial(
            self.note_duration + self.note_silence,
            self.num_notes + 1,
            self.time_after_singing,
        )
    }
}
