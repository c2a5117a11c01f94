use serde::{Deserialize, Serialize};

use crate::model::types::{ConceptNode, DifficultyLevel, PerformanceMetrics, ProgressState};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub topic: String,
    /// Trims the learning path (beginner keeps one node, intermediate two)
    /// and seeds the session difficulty.
    #[serde(default)]
    pub preferred_difficulty: Option<DifficultyLevel>,
    /// Overrides the starting difficulty without trimming the path.
    #[serde(default)]
    pub initial_difficulty: Option<DifficultyLevel>,
    /// Minutes.
    #[serde(default)]
    pub max_duration: Option<u32>,
    #[serde(default)]
    pub learning_goals: Vec<String>,
}

impl SessionConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn with_preferred_difficulty(mut self, level: DifficultyLevel) -> Self {
        self.preferred_difficulty = Some(level);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    #[serde(default)]
    pub current_step: Option<usize>,
    #[serde(default)]
    pub performance: Option<PerformanceMetrics>,
    /// Seconds.
    #[serde(default)]
    pub time_spent: Option<u64>,
    #[serde(default)]
    pub hints_used: Option<u32>,
}

impl SessionUpdate {
    pub fn step(step: usize) -> Self {
        Self {
            current_step: Some(step),
            ..Default::default()
        }
    }

    pub fn performance(metrics: PerformanceMetrics) -> Self {
        Self {
            performance: Some(metrics),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub topic: String,
    /// Seconds.
    pub duration: u64,
    pub concepts_covered: Vec<String>,
    pub mastered_concepts: Vec<String>,
    pub struggling_concepts: Vec<String>,
    pub overall_accuracy: f64,
    pub recommended_next_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgressReport {
    pub session_id: String,
    pub progress: ProgressState,
    pub percentage: f64,
    /// Minutes, extrapolated from the pace so far.
    pub estimated_time_remaining: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_concept: Option<ConceptNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSessionStats {
    pub total_sessions: usize,
    pub completed_sessions: usize,
    /// Minutes.
    pub total_study_time: f64,
    /// Minutes.
    pub average_session_length: f64,
    pub concepts_mastered: usize,
    pub average_accuracy: f64,
}
