use tracing::{debug, warn};

use crate::error::{ExtractionError, ScoringError};
use crate::extract::{
    check_measurements, AudioRef, CancelToken, ExtractionRequest, NoteMeasurement,
    PitchTrackExtractor,
};
use crate::melodies::definition::MelodyDefinition;
use crate::melodies::intervals::{to_intervals, to_intervals2reference, IntervalMode};
use crate::scoring::criteria::{failing_criteria, ClassifierKind, FailingCriteria, SungMelody, Verdict};
use crate::scoring::stats::compute_stats;
use crate::scoring::types::AnalysisResult;
use crate::transposition::{self, Register};

pub struct Recording<'a> {
    pub audio: &'a AudioRef,
    /// Where the extractor may write a diagnostic plot.
    pub plot_path: Option<&'a str>,
    pub cancel: &'a CancelToken,
}

fn run_extractor<E: PitchTrackExtractor + ?Sized>(
    extractor: &E,
    request: &ExtractionRequest<'_>,
) -> Result<Vec<NoteMeasurement>, ExtractionError> {
    if request.cancel.is_cancelled() {
        return Err(ExtractionError::Cancelled);
    }
    let notes = extractor.extract(request)?;
    if request.cancel.is_cancelled() {
        return Err(ExtractionError::Cancelled);
    }
    check_measurements(&notes)?;
    Ok(notes)
}

/// Score a recording of `melody` sung in `register`.
///
/// Extraction problems come back as a failed result. `Err` means the scorer
/// itself was handed inconsistent data.
pub fn analyze_recording<E: PitchTrackExtractor + ?Sized>(
    melody: &MelodyDefinition,
    register: Register,
    recording: &Recording<'_>,
    extractor: &E,
    criteria: &FailingCriteria,
) -> Result<AnalysisResult, ScoringError> {
    let target_pitches = transposition::apply(melody.target_pitches(), register);
    let reference_pitch = transposition::apply_pitch(melody.reference_pitch(), register);

    let request = ExtractionRequest {
        audio: recording.audio,
        target_pitches: &target_pitches,
        cancel: recording.cancel,
    };

    let (raw, extraction_error) = match run_extractor(extractor, &request) {
        Ok(raw) => (raw, None),
        Err(e) => {
            warn!(
                melody_id = melody.melody_id(),
                audio = %recording.audio.0,
                error = %e,
                "pitch extraction failed"
            );
            (Vec::new(), Some(e))
        }
    };

    if let (Some(path), None) = (recording.plot_path, &extraction_error) {
        if let Err(e) = extractor.save_plot(&request, &raw, path) {
            warn!(path, error = %e, "could not save analysis plot");
        }
    }

    let sung_pitches: Vec<f64> = raw.iter().map(|n| n.median_f0).collect();
    let sung_intervals = to_intervals(&sung_pitches, IntervalMode::PreviousNote);
    let target_intervals = to_intervals(&target_pitches, IntervalMode::PreviousNote);
    let stats = compute_stats(&sung_pitches, &target_pitches, &sung_intervals, &target_intervals)?;

    let verdict = match &extraction_error {
        Some(e) => Verdict::fail(format!("Analysis failed: {}", e)),
        None => failing_criteria(
            &SungMelody {
                sung_intervals: &sung_intervals,
                sung_pitches: &sung_pitches,
                reference_pitch,
                stats: &stats,
            },
            criteria,
        ),
    };
    debug!(
        melody_id = melody.melody_id(),
        %register,
        failed = verdict.failed,
        reason = %verdict.reason,
        "analyzed recording"
    );

    let sung_intervals2reference = match (criteria.kind, &extraction_error) {
        (ClassifierKind::Full, None) => {
            Some(to_intervals2reference(&sung_pitches, reference_pitch))
        }
        _ => None,
    };

    Ok(AnalysisResult {
        failed: verdict.failed,
        reason: verdict.reason,
        register,
        reference_pitch: transposition::invert_pitch(reference_pitch, register),
        num_target_pitches: target_pitches.len(),
        target_pitches: transposition::invert(&target_pitches, register),
        target_intervals,
        num_sung_pitches: sung_pitches.len(),
        sung_pitches: transposition::invert(&sung_pitches, register),
        sung_intervals,
        sung_intervals2reference,
        raw,
        save_plot: recording.plot_path.is_some(),
        stats,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::config::ExperimentConfig;
    use crate::extract::PrecomputedTrack;
    use crate::melodies::intervals::ReferenceMode;

    /// Sings back whatever it is told, offset from the target it receives,
    /// and remembers the hint it was given.
    struct EchoExtractor {
        offsets: Vec<f64>,
        seen_target: RefCell<Vec<f64>>,
        plot_fails: bool,
        plots: RefCell<Vec<String>>,
    }

    impl EchoExtractor {
        fn new(offsets: &[f64]) -> Self {
            EchoExtractor {
                offsets: offsets.to_vec(),
                seen_target: RefCell::new(Vec::new()),
                plot_fails: false,
                plots: RefCell::new(Vec::new()),
            }
        }
    }

    impl PitchTrackExtractor for EchoExtractor {
        fn extract(
            &self,
            request: &ExtractionRequest<'_>,
        ) -> Result<Vec<NoteMeasurement>, ExtractionError> {
            *self.seen_target.borrow_mut() = request.target_pitches.to_vec();
            Ok(request
                .target_pitches
                .iter()
                .zip(&self.offsets)
                .map(|(t, o)| NoteMeasurement::new(t + o))
                .collect())
        }

        fn save_plot(
            &self,
            _request: &ExtractionRequest<'_>,
            _notes: &[NoteMeasurement],
            path: &str,
        ) -> Result<(), ExtractionError> {
            if self.plot_fails {
                return Err(ExtractionError::Extractor("disk full".to_string()));
            }
            self.plots.borrow_mut().push(path.to_string());
            Ok(())
        }
    }

    struct BrokenExtractor;

    impl PitchTrackExtractor for BrokenExtractor {
        fn extract(
            &self,
            _request: &ExtractionRequest<'_>,
        ) -> Result<Vec<NoteMeasurement>, ExtractionError> {
            Err(ExtractionError::Unreadable("truncated wav header".to_string()))
        }
    }

    fn melody() -> MelodyDefinition {
        MelodyDefinition::new("Melody_1", 61.0, vec![60.0, 62.0, 65.0]).unwrap()
    }

    fn criteria() -> FailingCriteria {
        ExperimentConfig::default().failing_criteria(3)
    }

    fn run<E: PitchTrackExtractor>(extractor: &E, register: Register) -> AnalysisResult {
        let audio = AudioRef::from("trial.wav");
        let cancel = CancelToken::default();
        let recording = Recording {
            audio: &audio,
            plot_path: Some("trial.png"),
            cancel: &cancel,
        };
        analyze_recording(&melody(), register, &recording, extractor, &criteria()).unwrap()
    }

    #[test]
    fn test_low_register_roundtrip() {
        let extractor = EchoExtractor::new(&[0.0, 0.0, 0.0]);
        let result = run(&extractor, Register::Low);
        assert_eq!(*extractor.seen_target.borrow(), vec![48.0, 50.0, 53.0]);
        assert!(!result.failed);
        assert_eq!(result.reason, "All good");
        assert_eq!(result.register, Register::Low);
        assert_eq!(result.target_pitches, vec![60.0, 62.0, 65.0]);
        assert_eq!(result.sung_pitches, vec![60.0, 62.0, 65.0]);
        assert_eq!(result.reference_pitch, 61.0);
        assert_eq!(result.target_intervals, vec![2.0, 3.0]);
        assert_eq!(result.sung_intervals2reference, Some(vec![-1.0, 1.0, 4.0]));
        // Raw measurements stay in the register they were sung in.
        assert_eq!(result.raw[0].median_f0, 48.0);
        assert_eq!(result.stats.mean_abs_pitch_error, 0.0);
    }

    #[test]
    fn test_high_register_with_error() {
        let extractor = EchoExtractor::new(&[0.5, -0.5, 0.0]);
        let result = run(&extractor, Register::High);
        assert!(!result.failed);
        assert_eq!(result.sung_pitches, vec![60.5, 61.5, 65.0]);
        assert_eq!(result.sung_intervals, vec![1.0, 3.5]);
        assert!((result.stats.mean_abs_pitch_error - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(*extractor.plots.borrow(), vec!["trial.png".to_string()]);
        assert!(result.save_plot);
    }

    #[test]
    fn test_missing_note_fails() {
        let extractor = EchoExtractor::new(&[0.0, 0.0]);
        let result = run(&extractor, Register::High);
        assert!(result.failed);
        assert!(result.reason.contains("2 sung out of 3"));
        assert_eq!(result.num_sung_pitches, 2);
        assert_eq!(result.num_target_pitches, 3);
    }

    #[test]
    fn test_extraction_failure_is_data() {
        let result = run(&BrokenExtractor, Register::Low);
        assert!(result.failed);
        assert!(result.reason.contains("truncated wav header"));
        assert!(result.sung_pitches.is_empty());
        assert!(result.raw.is_empty());
        assert_eq!(result.target_pitches, vec![60.0, 62.0, 65.0]);
        assert!(result.stats.mean_abs_pitch_error.is_nan());
        assert_eq!(result.sung_intervals2reference, None);
    }

    #[test]
    fn test_failed_result_reloads_from_json() {
        let result = run(&BrokenExtractor, Register::Low);
        let json = serde_json::to_string(&result).unwrap();
        let back: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert!(back.failed);
        assert_eq!(back.reason, result.reason);
        assert_eq!(back.register, Register::Low);
        assert_eq!(back.target_pitches, vec![60.0, 62.0, 65.0]);
        assert!(back.stats.mean_abs_pitch_error.is_nan());
        assert!(back.stats.mean_abs_interval_error.is_nan());
        assert!(back.stats.max_abs_interval_error.is_nan());
        assert!(back.stats.melody_pitch_range.is_nan());
    }

    #[test]
    fn test_non_finite_measurement_is_failure() {
        let track = PrecomputedTrack::new(vec![
            NoteMeasurement::new(60.0),
            NoteMeasurement::new(f64::NAN),
            NoteMeasurement::new(65.0),
        ]);
        let result = run(&track, Register::High);
        assert!(result.failed);
        assert!(result.reason.contains("note 1"));
    }

    #[test]
    fn test_plot_failure_does_not_abort() {
        let mut extractor = EchoExtractor::new(&[0.0, 0.0, 0.0]);
        extractor.plot_fails = true;
        let result = run(&extractor, Register::High);
        assert!(!result.failed);
    }

    #[test]
    fn test_cancelled_analysis() {
        let audio = AudioRef::from("trial.wav");
        let cancel = CancelToken::default();
        cancel.cancel();
        let recording = Recording {
            audio: &audio,
            plot_path: None,
            cancel: &cancel,
        };
        let extractor = EchoExtractor::new(&[0.0, 0.0, 0.0]);
        let result =
            analyze_recording(&melody(), Register::High, &recording, &extractor, &criteria())
                .unwrap();
        assert!(result.failed);
        assert!(result.reason.contains("cancelled"));
        assert!(!result.save_plot);
    }

    #[test]
    fn test_note_count_variant_omits_intervals2reference() {
        let criteria = FailingCriteria {
            kind: ClassifierKind::NoteCount,
            reference_mode: ReferenceMode::PreviousNote,
            ..criteria()
        };
        let audio = AudioRef::from("trial.wav");
        let cancel = CancelToken::default();
        let recording = Recording {
            audio: &audio,
            plot_path: None,
            cancel: &cancel,
        };
        let extractor = EchoExtractor::new(&[0.0, 0.0, 0.0]);
        let result =
            analyze_recording(&melody(), Register::High, &recording, &extractor, &criteria)
                .unwrap();
        assert!(!result.failed);
        assert_eq!(result.sung_intervals2reference, None);
    }
}
