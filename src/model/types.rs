use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }

    /// One step up the fixed order; saturates at `Expert`.
    pub fn harder(&self) -> Self {
        match self {
            Self::Beginner => Self::Intermediate,
            Self::Intermediate => Self::Advanced,
            _ => Self::Expert,
        }
    }

    /// One step down the fixed order; saturates at `Beginner`.
    pub fn easier(&self) -> Self {
        match self {
            Self::Expert => Self::Advanced,
            Self::Advanced => Self::Intermediate,
            _ => Self::Beginner,
        }
    }

    /// Lossy projection of a level back onto the mastery scale.
    pub fn approximate_mastery(&self) -> f64 {
        match self {
            Self::Beginner => 0.2,
            Self::Intermediate => 0.5,
            Self::Advanced => 0.75,
            Self::Expert => 0.9,
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }

    pub fn can_transition_to(&self, target: SessionStatus) -> bool {
        matches!(
            (self, target),
            (Self::Active, Self::Paused)
                | (Self::Paused, Self::Active)
                | (Self::Active, Self::Completed)
                | (Self::Active, Self::Abandoned)
                | (Self::Paused, Self::Abandoned)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
    #[default]
    Mixed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyPreference {
    #[default]
    Adaptive,
    Challenging,
    Comfortable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    ExplanationViewed,
    ExerciseCompleted,
    AssessmentTaken,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExplanationViewed => "explanation_viewed",
            Self::ExerciseCompleted => "exercise_completed",
            Self::AssessmentTaken => "assessment_taken",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        if hour < 12 {
            Self::Morning
        } else if hour < 17 {
            Self::Afternoon
        } else {
            Self::Evening
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub email: bool,
    pub push: bool,
    pub session_reminders: bool,
    pub progress_updates: bool,
    pub weekly_reports: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            session_reminders: true,
            progress_updates: true,
            weekly_reports: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub learning_style: LearningStyle,
    pub difficulty_preference: DifficultyPreference,
    /// Minutes.
    pub session_length: u32,
    pub notification_settings: NotificationPreferences,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            learning_style: LearningStyle::Mixed,
            difficulty_preference: DifficultyPreference::Adaptive,
            session_length: 30,
            notification_settings: NotificationPreferences::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillLevel {
    pub concept: String,
    pub mastery: f64,
    pub confidence: f64,
    pub last_assessed: DateTime<Utc>,
    pub assessment_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningGoal {
    pub id: String,
    pub title: String,
    pub description: String,
    pub target_concepts: Vec<String>,
    pub target_mastery: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub status: GoalStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Seconds.
    pub duration: u64,
    pub success: bool,
    pub attempts: u32,
    pub hints_used: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPerformance {
    pub accuracy: f64,
    pub speed: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptationFlags {
    pub difficulty_adjusted: bool,
    pub content_personalized: bool,
    pub pacing_modified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub id: String,
    pub user_id: String,
    pub concept: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub activity: ActivityRecord,
    pub performance: ProgressPerformance,
    pub adaptations: AdaptationFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub preferences: UserPreferences,
    pub skill_levels: HashMap<String, SkillLevel>,
    pub learning_goals: Vec<LearningGoal>,
    pub progress_history: Vec<ProgressEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            email: email.into(),
            preferences: UserPreferences::default(),
            skill_levels: HashMap::new(),
            learning_goals: Vec::new(),
            progress_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn active_goals(&self) -> impl Iterator<Item = &LearningGoal> {
        self.learning_goals
            .iter()
            .filter(|goal| goal.status == GoalStatus::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptNode {
    pub id: String,
    pub name: String,
    pub description: String,
    pub prerequisites: Vec<String>,
    pub difficulty: DifficultyLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub current_step: usize,
    pub total_steps: usize,
    pub completed_concepts: Vec<String>,
    pub struggling_concepts: Vec<String>,
    pub mastered_concepts: Vec<String>,
    pub concepts_covered: u32,
}

impl ProgressState {
    pub fn new(total_steps: usize) -> Self {
        Self {
            total_steps,
            ..Default::default()
        }
    }

    /// Returns true when the concept was not yet recorded as completed.
    pub fn mark_completed(&mut self, concept: &str) -> bool {
        if self.completed_concepts.iter().any(|c| c == concept) {
            return false;
        }
        self.completed_concepts.push(concept.to_string());
        true
    }

    /// A mastered concept is never also struggling.
    pub fn mark_struggling(&mut self, concept: &str) {
        if self.is_mastered(concept) || self.is_struggling(concept) {
            return;
        }
        self.struggling_concepts.push(concept.to_string());
    }

    pub fn mark_mastered(&mut self, concept: &str) -> bool {
        self.struggling_concepts.retain(|c| c != concept);
        if self.is_mastered(concept) {
            return false;
        }
        self.mastered_concepts.push(concept.to_string());
        true
    }

    pub fn is_mastered(&self, concept: &str) -> bool {
        self.mastered_concepts.iter().any(|c| c == concept)
    }

    pub fn is_struggling(&self, concept: &str) -> bool {
        self.struggling_concepts.iter().any(|c| c == concept)
    }

    pub fn percentage(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        self.current_step as f64 / self.total_steps as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningSession {
    pub id: String,
    pub user_id: String,
    pub topic: String,
    pub current_difficulty: DifficultyLevel,
    pub learning_path: Vec<ConceptNode>,
    pub progress: ProgressState,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u32>,
    #[serde(default)]
    pub learning_goals: Vec<String>,
}

impl LearningSession {
    pub fn current_concept(&self) -> Option<&ConceptNode> {
        self.learning_path.get(self.progress.current_step)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub accuracy: f64,
    pub speed: f64,
    pub engagement: f64,
    pub retention: f64,
    pub timestamp: DateTime<Utc>,
}

impl PerformanceMetrics {
    pub fn with_accuracy(accuracy: f64) -> Self {
        Self {
            accuracy,
            speed: 0.5,
            engagement: 0.5,
            retention: 0.5,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    /// Seconds.
    pub duration: u64,
    pub concepts_covered: u32,
    pub exercises_completed: u32,
    pub hints_used: u32,
    pub average_accuracy: f64,
    pub engagement_score: f64,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self {
            duration: 0,
            concepts_covered: 0,
            exercises_completed: 0,
            hints_used: 0,
            average_accuracy: 0.0,
            engagement_score: 1.0,
        }
    }
}
