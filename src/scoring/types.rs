use serde::{Deserialize, Serialize};

use crate::extract::NoteMeasurement;
use crate::scoring::stats::PerformanceStats;
use crate::transposition::Register;

/// Outcome of scoring one recorded attempt. Pitches are in canonical
/// (high-register) units whatever register the participant sang in.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AnalysisResult {
    pub failed: bool,
    pub reason: String,
    pub register: Register,
    pub reference_pitch: f64,
    pub target_pitches: Vec<f64>,
    pub num_target_pitches: usize,
    pub target_intervals: Vec<f64>,
    pub sung_pitches: Vec<f64>,
    pub num_sung_pitches: usize,
    pub sung_intervals: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sung_intervals2reference: Option<Vec<f64>>,
    pub raw: Vec<NoteMeasurement>,
    pub save_plot: bool,
    pub stats: PerformanceStats,
}
