mod engine;
pub mod personalize;
pub mod types;

pub use engine::PersonalizationEngine;
pub use types::{
    DifficultyAdjustment, EngineInsights, LearningMaterial, LearningPrediction, MaterialContent,
    MaterialMetadata, MaterialType, PacingRecommendation, PerformanceData, PersonalizationModel,
    PersonalizedContent,
};
