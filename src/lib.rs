use serde::Serialize;
use wasm_bindgen::prelude::*;

mod config;
pub mod error;
pub mod extract;
pub mod melodies;
mod rng;
pub mod scoring;
pub mod transposition;
mod trial;

pub use config::{estimate_time_per_trial, ExperimentConfig, RovingMean, TrialTiming};
pub use rng::{RandomSource, Rng};
pub use trial::{FeedbackTier, Presentation, TrialContext, TrialLifecycle, TrialPhase};

use error::ExtractionError;
use extract::{
    AudioRef, CancelToken, ExtractionRequest, NoteMeasurement, PitchTrackExtractor,
    PrecomputedTrack,
};
use melodies::{MelodyDefinition, MelodySet};
use scoring::Recording;
use transposition::Register;

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(js_err)
}

fn config_from_js(config_js: JsValue) -> Result<ExperimentConfig, JsValue> {
    if config_js.is_null() || config_js.is_undefined() {
        return Ok(ExperimentConfig::default());
    }
    let config: ExperimentConfig = serde_wasm_bindgen::from_value(config_js).map_err(js_err)?;
    config.validate().map_err(js_err)?;
    Ok(config)
}

fn rng_for(seed: Option<u64>) -> Result<Rng, JsValue> {
    match seed {
        Some(seed) => Ok(Rng::new_with_seed(seed as u128)),
        None => Rng::from_entropy().map_err(js_err),
    }
}

fn trial_context(melody_js: JsValue, register: &str) -> Result<TrialContext, JsValue> {
    let melody: MelodyDefinition = serde_wasm_bindgen::from_value(melody_js).map_err(js_err)?;
    let register: Register = register.parse().map_err(js_err)?;
    Ok(TrialContext::new(melody, register))
}

/// Extractor backed by host-side JS: `extract(audio_ref, Float64Array)`
/// returns `[{median_f0, ...}]`; `plot(path, notes)` is optional.
struct JsExtractor<'a> {
    extract: &'a js_sys::Function,
    plot: Option<&'a js_sys::Function>,
}

impl PitchTrackExtractor for JsExtractor<'_> {
    fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Vec<NoteMeasurement>, ExtractionError> {
        let target = js_sys::Float64Array::from(request.target_pitches);
        let value = self
            .extract
            .call2(
                &JsValue::NULL,
                &JsValue::from_str(&request.audio.0),
                &target.into(),
            )
            .map_err(|e| ExtractionError::Extractor(describe(&e)))?;
        if value.is_null() || value.is_undefined() {
            return Err(ExtractionError::NoVoice);
        }
        serde_wasm_bindgen::from_value(value).map_err(|e| ExtractionError::Extractor(e.to_string()))
    }

    fn save_plot(
        &self,
        _request: &ExtractionRequest<'_>,
        notes: &[NoteMeasurement],
        path: &str,
    ) -> Result<(), ExtractionError> {
        let Some(plot) = self.plot else {
            return Ok(());
        };
        let notes = to_js(&notes).map_err(|e| ExtractionError::Extractor(describe(&e)))?;
        plot.call2(&JsValue::NULL, &JsValue::from_str(path), &notes)
            .map(|_| ())
            .map_err(|e| ExtractionError::Extractor(describe(&e)))
    }
}

/// Build the fixed pool of random melodies. Pass a seed to reproduce a pool.
#[wasm_bindgen]
pub fn generate_melody_pool(config_js: JsValue, seed: Option<u64>) -> Result<JsValue, JsValue> {
    let config = config_from_js(config_js)?;
    let mut rng = rng_for(seed)?;
    let pool = melodies::build_random_pool(&config, &mut rng).map_err(js_err)?;
    to_js(&pool)
}

/// Build the stimulus pool from a melody-set file, optionally one set only.
#[wasm_bindgen]
pub fn load_melody_set(
    json: &str,
    set: Option<String>,
    config_js: JsValue,
) -> Result<JsValue, JsValue> {
    let config = config_from_js(config_js)?;
    let mut melody_set = MelodySet::from_json(json).map_err(js_err)?;
    if let Some(set) = set {
        melody_set = melody_set.filter_set(&set);
    }
    let definitions = melody_set
        .definitions(Some(config.num_notes))
        .map_err(js_err)?;
    to_js(&definitions)
}

#[wasm_bindgen]
pub fn calibration_melody(seed: Option<u64>) -> Result<js_sys::Float64Array, JsValue> {
    let mut rng = rng_for(seed)?;
    let pitches = melodies::calibration_melody(&mut rng).map_err(js_err)?;
    Ok(js_sys::Float64Array::from(pitches.as_slice()))
}

/// `predicted` is "low", "high", or anything else for "unknown".
#[wasm_bindgen]
pub fn assign_register(predicted: &str, seed: Option<u64>) -> Result<String, JsValue> {
    let mut rng = rng_for(seed)?;
    let register = Register::assign(predicted.parse().ok(), &mut rng);
    Ok(register.to_string())
}

/// Pitches and durations for the trial page, in the participant's register.
#[wasm_bindgen]
pub fn display_pitches(
    melody_js: JsValue,
    register: &str,
    config_js: JsValue,
) -> Result<JsValue, JsValue> {
    let config = config_from_js(config_js)?;
    let context = trial_context(melody_js, register)?;
    to_js(&context.presentation(&config))
}

#[wasm_bindgen]
pub fn trial_timing(config_js: JsValue) -> Result<JsValue, JsValue> {
    let config = config_from_js(config_js)?;
    to_js(&config.trial_timing())
}

/// Run the host's extractor on a recording and score it.
#[wasm_bindgen]
pub fn analyze_recording(
    melody_js: JsValue,
    register: &str,
    audio_ref: &str,
    extractor: &js_sys::Function,
    plot: Option<js_sys::Function>,
    plot_path: Option<String>,
    config_js: JsValue,
) -> Result<JsValue, JsValue> {
    let config = config_from_js(config_js)?;
    let context = trial_context(melody_js, register)?;
    let extractor = JsExtractor {
        extract: extractor,
        plot: plot.as_ref(),
    };
    let audio = AudioRef(audio_ref.to_string());
    let cancel = CancelToken::default();
    let plot_path = plot_path.filter(|_| config.save_plot);
    let recording = Recording {
        audio: &audio,
        plot_path: plot_path.as_deref(),
        cancel: &cancel,
    };
    let result = context
        .analyze(&recording, &extractor, &config)
        .map_err(js_err)?;
    to_js(&result)
}

/// Score measurements that were already extracted.
#[wasm_bindgen]
pub fn score_measurements(
    melody_js: JsValue,
    register: &str,
    raw_js: JsValue,
    config_js: JsValue,
) -> Result<JsValue, JsValue> {
    let config = config_from_js(config_js)?;
    let context = trial_context(melody_js, register)?;
    let raw: Vec<NoteMeasurement> = serde_wasm_bindgen::from_value(raw_js).map_err(js_err)?;
    let audio = AudioRef(String::new());
    let cancel = CancelToken::default();
    let recording = Recording {
        audio: &audio,
        plot_path: None,
        cancel: &cancel,
    };
    let result = context
        .analyze(&recording, &PrecomputedTrack::new(raw), &config)
        .map_err(js_err)?;
    to_js(&result)
}

/// Practice feedback: returns `{tier, message}`.
#[wasm_bindgen]
pub fn feedback_tier(num_sung_pitches: u32, num_target_pitches: u32) -> Result<JsValue, JsValue> {
    #[derive(Serialize)]
    struct Feedback {
        tier: FeedbackTier,
        message: &'static str,
    }

    let tier = FeedbackTier::from_counts(num_sung_pitches as usize, num_target_pitches as usize);
    to_js(&Feedback {
        tier,
        message: tier.message(),
    })
}
