use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::melodies::definition::MelodyDefinition;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MelodySetEntry {
    pub set: String,
    pub melody: String,
    pub target_pitches: Vec<f64>,
    /// Anchors on the first target pitch when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_pitch: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct MelodySet {
    pub entries: Vec<MelodySetEntry>,
}

impl MelodySet {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn filter_set(&self, set: &str) -> MelodySet {
        MelodySet {
            entries: self.entries.iter().filter(|e| e.set == set).cloned().collect(),
        }
    }

    /// Convert every entry, rejecting melodies whose length differs from
    /// `num_notes` when one is given.
    pub fn definitions(&self, num_notes: Option<usize>) -> Result<Vec<MelodyDefinition>> {
        self.entries
            .iter()
            .map(|entry| -> Result<MelodyDefinition> {
                let melody_id = format!("{}/{}", entry.set, entry.melody);
                if let Some(n) = num_notes {
                    if entry.target_pitches.len() != n {
                        return Err(ConfigError(format!(
                            "{} has {} notes, expected {}",
                            melody_id,
                            entry.target_pitches.len(),
                            n
                        ))
                        .into());
                    }
                }
                let reference_pitch = match (entry.reference_pitch, entry.target_pitches.first()) {
                    (Some(r), _) => r,
                    (None, Some(first)) => *first,
                    (None, None) => {
                        return Err(ConfigError(format!("{} has no target pitches", melody_id)).into())
                    }
                };
                Ok(MelodyDefinition::new(
                    melody_id,
                    reference_pitch,
                    entry.target_pitches.clone(),
                )?)
            })
            .collect()
    }
}
