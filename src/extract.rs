use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

/// Per-note measurement reported by the extractor. Anything beyond
/// `median_f0` is carried through untouched.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NoteMeasurement {
    /// Median fundamental frequency of the note, in semitones.
    pub median_f0: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl NoteMeasurement {
    pub fn new(median_f0: f64) -> Self {
        NoteMeasurement {
            median_f0,
            extra: BTreeMap::new(),
        }
    }
}

/// Where the recording lives: a file path, asset key, or URL.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct AudioRef(pub String);

impl From<&str> for AudioRef {
    fn from(s: &str) -> Self {
        AudioRef(s.to_string())
    }
}

#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ExtractionRequest<'a> {
    pub audio: &'a AudioRef,
    /// Expected pitches in the participant's register; a hint only.
    pub target_pitches: &'a [f64],
    pub cancel: &'a CancelToken,
}

pub trait PitchTrackExtractor {
    fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Vec<NoteMeasurement>, ExtractionError>;

    /// Write a diagnostic plot. Best effort: the analyzer logs failures and
    /// carries on.
    fn save_plot(
        &self,
        _request: &ExtractionRequest<'_>,
        _notes: &[NoteMeasurement],
        _path: &str,
    ) -> Result<(), ExtractionError> {
        Ok(())
    }
}

/// Extractor that hands back measurements computed elsewhere, e.g. by the
/// browser before upload.
#[derive(Clone, Debug, Default)]
pub struct PrecomputedTrack {
    pub notes: Vec<NoteMeasurement>,
}

impl PrecomputedTrack {
    pub fn new(notes: Vec<NoteMeasurement>) -> Self {
        PrecomputedTrack { notes }
    }
}

impl PitchTrackExtractor for PrecomputedTrack {
    fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Vec<NoteMeasurement>, ExtractionError> {
        if request.cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        Ok(self.notes.clone())
    }
}

/// Reject measurements the scorer cannot use.
pub fn check_measurements(notes: &[NoteMeasurement]) -> Result<(), ExtractionError> {
    match notes.iter().position(|n| !n.median_f0.is_finite()) {
        Some(index) => Err(ExtractionError::InvalidMeasurement { index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_keeps_extra_fields() {
        let note: NoteMeasurement =
            serde_json::from_str(r#"{"median_f0": 57.2, "onset": 0.41, "label": "TA"}"#).unwrap();
        assert_eq!(note.median_f0, 57.2);
        assert_eq!(note.extra["onset"], serde_json::json!(0.41));
        let back = serde_json::to_value(&note).unwrap();
        assert_eq!(back["label"], "TA");
    }

    #[test]
    fn test_measurement_requires_median_f0() {
        assert!(serde_json::from_str::<NoteMeasurement>(r#"{"onset": 0.4}"#).is_err());
    }

    #[test]
    fn test_precomputed_track_honours_cancel() {
        let track = PrecomputedTrack::new(vec![NoteMeasurement::new(60.0)]);
        let audio = AudioRef::from("take1.wav");
        let cancel = CancelToken::default();
        let request = ExtractionRequest {
            audio: &audio,
            target_pitches: &[60.0],
            cancel: &cancel,
        };
        assert_eq!(track.extract(&request).unwrap().len(), 1);
        cancel.clone().cancel();
        assert_eq!(track.extract(&request), Err(ExtractionError::Cancelled));
    }

    #[test]
    fn test_check_measurements() {
        let notes = vec![NoteMeasurement::new(60.0), NoteMeasurement::new(f64::NAN)];
        assert_eq!(
            check_measurements(&notes),
            Err(ExtractionError::InvalidMeasurement { index: 1 })
        );
        assert!(check_measurements(&notes[..1]).is_ok());
    }
}
