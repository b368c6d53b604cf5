use serde::{Deserialize, Serialize};

use crate::config::{ExperimentConfig, TrialTiming};
use crate::error::{LifecycleError, ScoringError};
use crate::extract::PitchTrackExtractor;
use crate::melodies::MelodyDefinition;
use crate::scoring::{analyze_recording, AnalysisResult, Recording};
use crate::transposition::{self, Register};

/// What the page plays and how long it records for.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Presentation {
    pub melody_id: String,
    pub pitches: Vec<f64>,
    pub num_notes: usize,
    pub timing: TrialTiming,
}

#[derive(Clone, Debug)]
pub struct TrialContext {
    pub melody: MelodyDefinition,
    pub register: Register,
}

impl TrialContext {
    pub fn new(melody: MelodyDefinition, register: Register) -> Self {
        TrialContext { melody, register }
    }

    pub fn presentation(&self, config: &ExperimentConfig) -> Presentation {
        let pitches = transposition::apply(self.melody.target_pitches(), self.register);
        Presentation {
            melody_id: self.melody.melody_id().to_string(),
            num_notes: pitches.len(),
            pitches,
            timing: config.trial_timing(),
        }
    }

    pub fn analyze<E: PitchTrackExtractor + ?Sized>(
        &self,
        recording: &Recording<'_>,
        extractor: &E,
        config: &ExperimentConfig,
    ) -> Result<AnalysisResult, ScoringError> {
        let criteria = config.failing_criteria(self.melody.num_notes());
        analyze_recording(&self.melody, self.register, recording, extractor, &criteria)
    }
}

/// Practice feedback, decided by note count alone.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTier {
    Great,
    CanDoBetter,
    Bad,
}

impl FeedbackTier {
    pub fn from_counts(num_sung_pitches: usize, num_target_pitches: usize) -> Self {
        match num_sung_pitches.abs_diff(num_target_pitches) {
            0 => FeedbackTier::Great,
            1 => FeedbackTier::CanDoBetter,
            _ => FeedbackTier::Bad,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            FeedbackTier::Great => "Great! You sang the right number of notes.",
            FeedbackTier::CanDoBetter => {
                "You can do better: you were one note off. Leave silent gaps between notes."
            }
            FeedbackTier::Bad => {
                "Bad: the number of notes was far off. Sing each note clearly and separately."
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrialPhase {
    Created,
    Presented,
    Recorded,
    Analyzed,
    Feedback,
    Passed,
    Failed,
}

impl TrialPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            TrialPhase::Created => "created",
            TrialPhase::Presented => "presented",
            TrialPhase::Recorded => "recorded",
            TrialPhase::Analyzed => "analyzed",
            TrialPhase::Feedback => "feedback",
            TrialPhase::Passed => "passed",
            TrialPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TrialPhase::Passed | TrialPhase::Failed)
    }
}

/// One recording attempt. Practice attempts pass through `Feedback` before
/// settling.
#[derive(Clone, Debug)]
pub struct TrialLifecycle {
    phase: TrialPhase,
    practice: bool,
    outcome: Option<(bool, usize, usize)>,
}

impl TrialLifecycle {
    pub fn new(practice: bool) -> Self {
        TrialLifecycle {
            phase: TrialPhase::Created,
            practice,
            outcome: None,
        }
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    fn advance(&mut self, from: TrialPhase, to: TrialPhase) -> Result<(), LifecycleError> {
        if self.phase != from {
            return Err(LifecycleError {
                from: self.phase.as_str(),
                to: to.as_str(),
            });
        }
        self.phase = to;
        Ok(())
    }

    pub fn present(&mut self) -> Result<(), LifecycleError> {
        self.advance(TrialPhase::Created, TrialPhase::Presented)
    }

    pub fn record(&mut self) -> Result<(), LifecycleError> {
        self.advance(TrialPhase::Presented, TrialPhase::Recorded)
    }

    pub fn analyzed(&mut self, result: &AnalysisResult) -> Result<(), LifecycleError> {
        self.advance(TrialPhase::Recorded, TrialPhase::Analyzed)?;
        self.outcome = Some((result.failed, result.num_sung_pitches, result.num_target_pitches));
        Ok(())
    }

    pub fn feedback(&mut self) -> Result<FeedbackTier, LifecycleError> {
        match (self.practice, self.outcome) {
            (true, Some((_, sung, target))) => {
                self.advance(TrialPhase::Analyzed, TrialPhase::Feedback)?;
                Ok(FeedbackTier::from_counts(sung, target))
            }
            _ => Err(LifecycleError {
                from: self.phase.as_str(),
                to: TrialPhase::Feedback.as_str(),
            }),
        }
    }

    pub fn finish(&mut self) -> Result<TrialPhase, LifecycleError> {
        let ready = if self.practice {
            TrialPhase::Feedback
        } else {
            TrialPhase::Analyzed
        };
        let terminal = match self.outcome {
            Some((true, _, _)) => TrialPhase::Failed,
            _ => TrialPhase::Passed,
        };
        self.advance(ready, terminal)?;
        Ok(terminal)
    }
}
