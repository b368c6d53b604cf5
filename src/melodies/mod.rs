pub mod definition;
pub mod intervals;
pub mod sampler;
pub mod set;

pub use definition::{build_random_pool, generate_random_melody, MelodyDefinition};
pub use intervals::{
    from_intervals, to_intervals, to_intervals2reference, IntervalMode, ReferenceMode,
};
pub use sampler::{
    calibration_melody, sample_absolute_pitches, sample_interval_sequence, sample_reference_pitch,
    PitchDistribution, SamplingPolicy,
};
pub use set::{MelodySet, MelodySetEntry};
