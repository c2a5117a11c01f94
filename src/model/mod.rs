pub mod skill;
pub mod thresholds;
pub mod types;

pub use thresholds::{DifficultyPolicy, ThresholdTable};
pub use types::*;
