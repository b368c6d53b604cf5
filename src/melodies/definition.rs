use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ExperimentConfig;
use crate::error::{ConfigError, Result};
use crate::melodies::intervals::{to_intervals, to_intervals2reference, IntervalMode};
use crate::melodies::sampler::{sample_absolute_pitches, sample_reference_pitch, SamplingPolicy};
use crate::rng::RandomSource;
use crate::transposition::Register;

#[derive(Deserialize)]
struct MelodyFields {
    melody_id: String,
    reference_pitch: f64,
    target_pitches: Vec<f64>,
}

/// One stimulus in canonical (high-register) units. Derived interval fields
/// are computed at construction and cannot drift from `target_pitches`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(try_from = "MelodyFields")]
pub struct MelodyDefinition {
    melody_id: String,
    reference_pitch: f64,
    target_pitches: Vec<f64>,
    target_intervals: Vec<f64>,
    target_intervals2reference: Vec<f64>,
}

impl MelodyDefinition {
    pub fn new(
        melody_id: impl Into<String>,
        reference_pitch: f64,
        target_pitches: Vec<f64>,
    ) -> std::result::Result<Self, ConfigError> {
        let melody_id = melody_id.into();
        if target_pitches.is_empty() {
            return Err(ConfigError(format!("{} has no target pitches", melody_id)));
        }
        if !reference_pitch.is_finite() || target_pitches.iter().any(|p| !p.is_finite()) {
            return Err(ConfigError(format!("{} has non-finite pitches", melody_id)));
        }
        let target_intervals = to_intervals(&target_pitches, IntervalMode::PreviousNote);
        let target_intervals2reference = to_intervals2reference(&target_pitches, reference_pitch);
        Ok(MelodyDefinition {
            melody_id,
            reference_pitch,
            target_pitches,
            target_intervals,
            target_intervals2reference,
        })
    }

    pub fn melody_id(&self) -> &str {
        &self.melody_id
    }

    pub fn reference_pitch(&self) -> f64 {
        self.reference_pitch
    }

    pub fn target_pitches(&self) -> &[f64] {
        &self.target_pitches
    }

    pub fn target_intervals(&self) -> &[f64] {
        &self.target_intervals
    }

    pub fn target_intervals2reference(&self) -> &[f64] {
        &self.target_intervals2reference
    }

    pub fn num_notes(&self) -> usize {
        self.target_pitches.len()
    }
}

impl TryFrom<MelodyFields> for MelodyDefinition {
    type Error = ConfigError;

    fn try_from(fields: MelodyFields) -> std::result::Result<Self, Self::Error> {
        MelodyDefinition::new(fields.melody_id, fields.reference_pitch, fields.target_pitches)
    }
}

pub fn generate_random_melody(
    index: usize,
    roving_mean: f64,
    roving_width: f64,
    max_interval2reference: f64,
    num_notes: usize,
    policy: &SamplingPolicy,
    rng: &mut impl RandomSource,
) -> Result<MelodyDefinition> {
    let reference_pitch = sample_reference_pitch(roving_mean, roving_width, rng)?;
    let target_pitches =
        sample_absolute_pitches(reference_pitch, max_interval2reference, num_notes, policy, rng)?;
    let melody = MelodyDefinition::new(format!("Melody_{}", index), reference_pitch, target_pitches)?;
    debug!(
        melody_id = melody.melody_id(),
        reference_pitch,
        target_pitches = ?melody.target_pitches(),
        "sampled melody"
    );
    Ok(melody)
}

/// Fixed pool of random stimuli, ids `Melody_1..=Melody_N`, drawn around the
/// high-register roving mean.
pub fn build_random_pool(
    config: &ExperimentConfig,
    rng: &mut impl RandomSource,
) -> Result<Vec<MelodyDefinition>> {
    config.validate()?;
    let roving_mean = config.roving_mean.for_register(Some(Register::High));
    let pool = (1..=config.num_melodies)
        .map(|index| {
            generate_random_melody(
                index,
                roving_mean,
                config.roving_width,
                config.max_interval2reference,
                config.num_notes,
                &config.sampling,
                rng,
            )
        })
        .collect::<Result<Vec<_>>>()?;
    info!(size = pool.len(), num_notes = config.num_notes, "built melody pool");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RovingMean;
    use crate::error::Error;
    use crate::rng::Rng;

    #[test]
    fn test_definition_derives_intervals() {
        let melody = MelodyDefinition::new("m", 55.0, vec![60.0, 62.0, 65.0]).unwrap();
        assert_eq!(melody.target_intervals(), &[2.0, 3.0]);
        assert_eq!(melody.target_intervals2reference(), &[5.0, 7.0, 10.0]);
        assert_eq!(melody.target_intervals().len(), melody.num_notes() - 1);
        assert_eq!(melody.target_intervals2reference().len(), melody.num_notes());
    }

    #[test]
    fn test_intervals2reference_scenario() {
        let melody = MelodyDefinition::new("m", 55.0, vec![57.0, 60.0]).unwrap();
        assert_eq!(melody.target_intervals2reference(), &[2.0, 5.0]);
    }

    #[test]
    fn test_definition_rejects_bad_input() {
        assert!(MelodyDefinition::new("m", 55.0, vec![]).is_err());
        assert!(MelodyDefinition::new("m", f64::NAN, vec![60.0]).is_err());
        assert!(MelodyDefinition::new("m", 55.0, vec![60.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn test_deserialize_recomputes_intervals() {
        let json = r#"{"melody_id": "x", "reference_pitch": 55, "target_pitches": [60, 62, 65],
                       "target_intervals": [9, 9]}"#;
        let melody: MelodyDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(melody.target_intervals(), &[2.0, 3.0]);

        let bad = r#"{"melody_id": "x", "reference_pitch": 55, "target_pitches": []}"#;
        assert!(serde_json::from_str::<MelodyDefinition>(bad).is_err());
    }

    #[test]
    fn test_serialize_exposes_all_fields() {
        let melody = MelodyDefinition::new("Melody_1", 55.0, vec![57.0, 60.0]).unwrap();
        let value = serde_json::to_value(&melody).unwrap();
        assert_eq!(value["melody_id"], "Melody_1");
        assert_eq!(value["target_intervals"], serde_json::json!([3.0]));
        assert_eq!(value["target_intervals2reference"], serde_json::json!([2.0, 5.0]));
    }

    #[test]
    fn test_generate_random_melody() {
        let mut rng = Rng::new_with_seed(17);
        let melody =
            generate_random_melody(4, 61.0, 2.5, 10.0, 3, &SamplingPolicy::default(), &mut rng)
                .unwrap();
        assert_eq!(melody.melody_id(), "Melody_4");
        assert!((58.5..=63.5).contains(&melody.reference_pitch()));
        assert_eq!(melody.num_notes(), 3);
        for interval in melody.target_intervals2reference() {
            assert!(interval.abs() <= 10.0);
        }
    }

    #[test]
    fn test_pool_is_reproducible() {
        let config = ExperimentConfig::default();
        let a = build_random_pool(&config, &mut Rng::new_with_seed(99)).unwrap();
        let b = build_random_pool(&config, &mut Rng::new_with_seed(99)).unwrap();
        assert_eq!(a.len(), config.num_melodies);
        assert_eq!(a, b);
        assert_eq!(a[0].melody_id(), "Melody_1");
    }

    #[test]
    fn test_pool_draws_around_high_register_mean() {
        let config = ExperimentConfig {
            roving_mean: RovingMean {
                default: 0.0,
                low: 20.0,
                high: 80.0,
            },
            roving_width: 1.0,
            max_interval2reference: 5.0,
            ..ExperimentConfig::default()
        };
        let pool = build_random_pool(&config, &mut Rng::new_with_seed(5)).unwrap();
        for melody in &pool {
            assert!((79.0..=81.0).contains(&melody.reference_pitch()));
        }
    }

    #[test]
    fn test_pool_rejects_invalid_config() {
        let config = ExperimentConfig {
            num_notes: 1,
            ..ExperimentConfig::default()
        };
        let result = build_random_pool(&config, &mut Rng::new_with_seed(1));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
