use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rng::RandomSource;

pub const OCTAVE: f64 = 12.0;

/// Octave band assigned to a participant. Stimuli are stored for the high
/// register; low-register participants hear and sing everything an octave down.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Register {
    Low,
    High,
}

impl Register {
    /// Semitones added to canonical pitches for this register.
    pub fn offset(self) -> f64 {
        match self {
            Register::Low => -OCTAVE,
            Register::High => 0.0,
        }
    }

    /// Use the register predicted from the singing screen when there is one,
    /// otherwise pick either at random.
    pub fn assign(predicted: Option<Register>, rng: &mut impl RandomSource) -> Register {
        match predicted {
            Some(register) => register,
            None if rng.coin_flip() => Register::Low,
            None => Register::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Register::Low => "low",
            Register::High => "high",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Register {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Register::Low),
            "high" => Ok(Register::High),
            _ => Err(ConfigError(format!("Unknown register: {}", s))),
        }
    }
}

/// Canonical pitch to the pitch the participant hears and sings.
pub fn apply_pitch(pitch: f64, register: Register) -> f64 {
    pitch + register.offset()
}

/// Sung/heard pitch back to canonical units.
pub fn invert_pitch(pitch: f64, register: Register) -> f64 {
    pitch - register.offset()
}

pub fn apply(pitches: &[f64], register: Register) -> Vec<f64> {
    pitches.iter().map(|&p| apply_pitch(p, register)).collect()
}

pub fn invert(pitches: &[f64], register: Register) -> Vec<f64> {
    pitches.iter().map(|&p| invert_pitch(p, register)).collect()
}
