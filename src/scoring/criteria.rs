//! Pass/fail policy for a sung melody.
//!
//! Rules are checked in order and the first one that fires decides the
//! verdict. Adding a rule means adding a function to the list.

use serde::{Deserialize, Serialize};

use crate::melodies::intervals::{pitch_range, ReferenceMode};
use crate::scoring::stats::PerformanceStats;

pub const ALL_GOOD: &str = "All good";
pub const PITCH_OUT_OF_RANGE: &str = "pitch out of range";
pub const INTERVAL_TOO_LARGE: &str = "interval too large";
pub const RANGE_TOO_LARGE: &str = "range too large";
pub const INTERVAL_ERROR_TOO_LARGE: &str = "interval error too large";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Note count, then pitch-mode or interval-mode checks.
    Full,
    /// Note count only.
    NoteCount,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FailingCriteria {
    pub kind: ClassifierKind,
    pub expected_num_intervals: usize,
    pub reference_mode: ReferenceMode,
    pub max_interval_size: f64,
    pub max_melody_pitch_range: f64,
    pub max_abs_interval_error_allowed: f64,
    pub max_interval2reference_window: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Verdict {
    pub failed: bool,
    pub reason: String,
}

impl Verdict {
    pub fn pass() -> Self {
        Verdict {
            failed: false,
            reason: ALL_GOOD.to_string(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Verdict {
            failed: true,
            reason: reason.into(),
        }
    }
}

/// What the classifier looks at, all in the register the participant sang in.
pub struct SungMelody<'a> {
    pub sung_intervals: &'a [f64],
    pub sung_pitches: &'a [f64],
    pub reference_pitch: f64,
    pub stats: &'a PerformanceStats,
}

type Rule = fn(&SungMelody<'_>, &FailingCriteria) -> Option<String>;

const FULL_RULES: &[Rule] = &[
    wrong_note_count,
    pitch_out_of_range,
    interval_too_large,
    range_too_large,
    interval_error_too_large,
];

const NOTE_COUNT_RULES: &[Rule] = &[note_count_mismatch];

fn expected_notes(criteria: &FailingCriteria) -> usize {
    criteria.expected_num_intervals + 1
}

fn wrong_note_count(sung: &SungMelody<'_>, criteria: &FailingCriteria) -> Option<String> {
    let expected = expected_notes(criteria);
    (sung.sung_pitches.len() != expected).then(|| {
        format!(
            "Wrong number of notes: {} sung out of {} expected",
            sung.sung_pitches.len(),
            expected
        )
    })
}

fn note_count_mismatch(sung: &SungMelody<'_>, criteria: &FailingCriteria) -> Option<String> {
    let expected = expected_notes(criteria);
    (sung.sung_pitches.len() != expected).then(|| {
        format!(
            "Number of sung notes does not match the melody: {} sung out of {}",
            sung.sung_pitches.len(),
            expected
        )
    })
}

fn pitch_out_of_range(sung: &SungMelody<'_>, criteria: &FailingCriteria) -> Option<String> {
    if criteria.reference_mode != ReferenceMode::PitchMode {
        return None;
    }
    let window = criteria.max_interval2reference_window;
    sung.sung_pitches
        .iter()
        .any(|p| (p - sung.reference_pitch).abs() > window)
        .then(|| PITCH_OUT_OF_RANGE.to_string())
}

fn interval_too_large(sung: &SungMelody<'_>, criteria: &FailingCriteria) -> Option<String> {
    if criteria.reference_mode == ReferenceMode::PitchMode {
        return None;
    }
    sung.sung_intervals
        .iter()
        .any(|i| i.abs() > criteria.max_interval_size)
        .then(|| INTERVAL_TOO_LARGE.to_string())
}

fn range_too_large(sung: &SungMelody<'_>, criteria: &FailingCriteria) -> Option<String> {
    if criteria.reference_mode == ReferenceMode::PitchMode {
        return None;
    }
    (pitch_range(sung.sung_pitches) > criteria.max_melody_pitch_range)
        .then(|| RANGE_TOO_LARGE.to_string())
}

fn interval_error_too_large(sung: &SungMelody<'_>, criteria: &FailingCriteria) -> Option<String> {
    if criteria.reference_mode == ReferenceMode::PitchMode {
        return None;
    }
    (sung.stats.mean_abs_interval_error > criteria.max_abs_interval_error_allowed)
        .then(|| INTERVAL_ERROR_TOO_LARGE.to_string())
}

pub fn failing_criteria(sung: &SungMelody<'_>, criteria: &FailingCriteria) -> Verdict {
    let rules = match criteria.kind {
        ClassifierKind::Full => FULL_RULES,
        ClassifierKind::NoteCount => NOTE_COUNT_RULES,
    };
    rules
        .iter()
        .find_map(|rule| rule(sung, criteria))
        .map(Verdict::fail)
        .unwrap_or_else(Verdict::pass)
}
