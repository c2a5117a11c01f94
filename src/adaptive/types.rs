use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{CodeExample, DiagramData};
use crate::model::types::{
    DifficultyLevel, LearningStyle, PerformanceMetrics, TimeOfDay, UserPreferences,
};

/// The engine's working copy of a learner. `skill_levels` is derived state
/// and lags the profile; the profile stays authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizationModel {
    pub user_id: String,
    pub learning_style: LearningStyle,
    pub skill_levels: HashMap<String, f64>,
    pub preferences: UserPreferences,
    pub performance_history: VecDeque<PerformanceMetrics>,
    pub last_active: DateTime<Utc>,
}

impl PersonalizationModel {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            learning_style: LearningStyle::Mixed,
            skill_levels: HashMap::new(),
            preferences: UserPreferences::default(),
            performance_history: VecDeque::new(),
            last_active: Utc::now(),
        }
    }

    pub fn mastery(&self, concept: &str) -> f64 {
        self.skill_levels.get(concept).copied().unwrap_or(0.0)
    }

    /// Appends and evicts from the front until `len <= cap`.
    pub fn push_performance(&mut self, metrics: PerformanceMetrics, cap: usize) {
        self.performance_history.push_back(metrics);
        while self.performance_history.len() > cap {
            self.performance_history.pop_front();
        }
    }

    /// The last `n` observations, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&PerformanceMetrics> {
        let skip = self.performance_history.len().saturating_sub(n);
        self.performance_history.iter().skip(skip).collect()
    }

    /// Consecutive entries with accuracy above `threshold`, counted back from
    /// the newest.
    pub fn trailing_streak(&self, threshold: f64) -> usize {
        self.performance_history
            .iter()
            .rev()
            .take_while(|entry| entry.accuracy > threshold)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub concept: String,
    pub metrics: PerformanceMetrics,
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
}

impl PerformanceData {
    pub fn new(concept: impl Into<String>, metrics: PerformanceMetrics) -> Self {
        Self {
            session_id: None,
            concept: concept.into(),
            metrics,
            context: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyAdjustment {
    pub from_level: DifficultyLevel,
    pub to_level: DifficultyLevel,
    pub reason: String,
    pub confidence: f64,
}

impl DifficultyAdjustment {
    pub fn is_change(&self) -> bool {
        self.from_level != self.to_level
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPrediction {
    pub concept: String,
    pub predicted_mastery: f64,
    /// Hours.
    pub time_to_mastery: f64,
    pub confidence: f64,
    pub recommended_path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacingRecommendation {
    /// Minutes.
    pub session_length: u32,
    /// Minutes between breaks.
    pub break_frequency: u32,
    pub content_density: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInsights {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub learning_velocity: f64,
    pub optimal_study_time: TimeOfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    Explanation,
    Exercise,
    Example,
    Assessment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveElement {
    pub id: String,
    pub kind: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub code: Vec<CodeExample>,
    #[serde(default)]
    pub diagrams: Vec<DiagramData>,
    #[serde(default)]
    pub interactive: Vec<InteractiveElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialMetadata {
    /// Minutes.
    pub estimated_time: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningMaterial {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub material_type: MaterialType,
    pub difficulty: DifficultyLevel,
    pub concepts: Vec<String>,
    pub prerequisites: Vec<String>,
    pub content: MaterialContent,
    pub metadata: MaterialMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedContent {
    pub original_content: LearningMaterial,
    pub adapted_content: LearningMaterial,
    pub adaptation_reasons: Vec<String>,
    pub personalized_for: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_cap_evicts_oldest() {
        let mut model = PersonalizationModel::new("u1");
        for i in 0..5 {
            model.push_performance(PerformanceMetrics::with_accuracy(i as f64 / 10.0), 3);
        }
        let accuracies: Vec<f64> = model.performance_history.iter().map(|m| m.accuracy).collect();
        assert_eq!(accuracies, vec![0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_trailing_streak_stops_at_first_miss() {
        let mut model = PersonalizationModel::new("u1");
        for accuracy in [0.9, 0.5, 0.8, 0.75, 0.71] {
            model.push_performance(PerformanceMetrics::with_accuracy(accuracy), 100);
        }
        assert_eq!(model.trailing_streak(0.7), 3);
        assert_eq!(model.recent(2).len(), 2);
        assert_eq!(model.recent(2)[0].accuracy, 0.75);
    }
}
