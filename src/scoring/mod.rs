pub mod analyzer;
pub mod criteria;
pub mod stats;
pub mod types;

pub use analyzer::{analyze_recording, Recording};
pub use criteria::{failing_criteria, ClassifierKind, FailingCriteria, SungMelody, Verdict};
pub use stats::{compute_stats, PerformanceStats};
pub use types::AnalysisResult;
