use serde::{Deserialize, Serialize};

use crate::model::skill;
use crate::model::types::{DifficultyLevel, LearningGoal, Priority, SkillLevel, TimeOfDay, UserProfile};
use crate::session::SessionSummary;

const WEAKEST_LIMIT: usize = 3;
const STRONGEST_LIMIT: usize = 2;
const RECOMMENDATION_LIMIT: usize = 5;
const UNREACHABLE_MILESTONE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Concept,
    Exercise,
    Review,
    Assessment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub title: String,
    pub description: String,
    /// Minutes.
    pub estimated_time: u32,
    pub difficulty: DifficultyLevel,
    pub priority: Priority,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySchedule {
    pub best_time_of_day: TimeOfDay,
    /// Minutes.
    pub recommended_session_length: u32,
    pub suggested_frequency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsBundle {
    pub overall_progress: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    pub learning_velocity: f64,
    pub time_to_next_milestone: f64,
    pub optimal_study_schedule: StudySchedule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeAssessment {
    pub current_level: SkillLevel,
    pub suggested_actions: Vec<String>,
    pub readiness_for_advancement: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub summary: SessionSummary,
    pub achievements: Vec<String>,
    pub next_recommendations: Vec<Recommendation>,
}

/// Weak spots to review, strengths to push on and active goals, highest
/// priority first. Ties keep that order.
pub fn recommendations(profile: &UserProfile) -> Vec<Recommendation> {
    let mut items: Vec<Recommendation> = Vec::new();

    for concept in skill::weakest_concepts(&profile.skill_levels, WEAKEST_LIMIT) {
        items.push(Recommendation {
            kind: RecommendationKind::Review,
            title: format!("Review {concept}"),
            description: format!("Strengthen your understanding of {concept} concepts"),
            estimated_time: 20,
            difficulty: DifficultyLevel::Beginner,
            priority: Priority::High,
            reason: "Low mastery level detected".to_string(),
        });
    }

    for concept in skill::strongest_concepts(&profile.skill_levels, STRONGEST_LIMIT) {
        items.push(Recommendation {
            kind: RecommendationKind::Concept,
            title: format!("Advanced {concept}"),
            description: format!("Explore advanced topics in {concept}"),
            estimated_time: 30,
            difficulty: DifficultyLevel::Advanced,
            priority: Priority::Medium,
            reason: "Strong foundation - ready for advanced material".to_string(),
        });
    }

    for goal in profile.active_goals() {
        items.push(Recommendation {
            kind: RecommendationKind::Concept,
            title: goal.title.clone(),
            description: goal.description.clone(),
            estimated_time: 45,
            difficulty: DifficultyLevel::Intermediate,
            priority: goal.priority,
            reason: "Active learning goal".to_string(),
        });
    }

    items.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()));
    items.truncate(RECOMMENDATION_LIMIT);
    items
}

fn goal_average(profile: &UserProfile, goal: &LearningGoal) -> f64 {
    if goal.target_concepts.is_empty() {
        return 0.0;
    }
    let total: f64 = goal
        .target_concepts
        .iter()
        .map(|concept| profile.skill_levels.get(concept).map_or(0.0, |s| s.mastery))
        .sum();
    total / goal.target_concepts.len() as f64
}

/// Projected time until the nearest active goal is reached at `velocity`.
/// Zero without active goals; a stalled or negative velocity projects the cap.
pub fn time_to_milestone(profile: &UserProfile, velocity: f64) -> f64 {
    profile
        .active_goals()
        .map(|goal| {
            let gap = goal.target_mastery - goal_average(profile, goal);
            if velocity > 0.0 {
                (gap / velocity).clamp(0.0, UNREACHABLE_MILESTONE)
            } else {
                UNREACHABLE_MILESTONE
            }
        })
        .fold(None, |nearest: Option<f64>, projected| {
            Some(nearest.map_or(projected, |n| n.min(projected)))
        })
        .unwrap_or(0.0)
}

pub fn study_frequency(velocity: f64) -> &'static str {
    if velocity > 0.1 {
        "Daily"
    } else if velocity > 0.05 {
        "3-4 times per week"
    } else if velocity > 0.02 {
        "2-3 times per week"
    } else {
        "Weekly"
    }
}

pub fn assess(current_level: SkillLevel) -> KnowledgeAssessment {
    let mut suggested_actions = Vec::new();
    let mut readiness_for_advancement = false;

    if current_level.mastery < 0.3 {
        suggested_actions.push("Start with basic concepts and fundamentals".to_string());
        suggested_actions.push("Practice with guided exercises".to_string());
    } else if current_level.mastery < 0.7 {
        suggested_actions.push("Continue practicing intermediate concepts".to_string());
        suggested_actions.push("Try applying knowledge to real-world scenarios".to_string());
    } else {
        suggested_actions.push("Ready for advanced topics".to_string());
        suggested_actions.push("Consider teaching others to reinforce learning".to_string());
        readiness_for_advancement = true;
    }

    if current_level.confidence < current_level.mastery - 0.2 {
        suggested_actions.push("Build confidence through additional practice".to_string());
    }

    KnowledgeAssessment {
        current_level,
        suggested_actions,
        readiness_for_advancement,
    }
}

pub fn achievements(summary: &SessionSummary) -> Vec<String> {
    let mut earned = Vec::new();

    if summary.overall_accuracy > 0.9 {
        earned.push("Excellent Performance - 90%+ accuracy!".to_string());
    } else if summary.overall_accuracy > 0.8 {
        earned.push("Great Job - 80%+ accuracy!".to_string());
    }

    if !summary.mastered_concepts.is_empty() {
        earned.push(format!(
            "Mastered {} new concept(s)!",
            summary.mastered_concepts.len()
        ));
    }

    if summary.duration >= 30 * 60 {
        earned.push("Dedicated Learner - 30+ minute session!".to_string());
    }

    earned
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::types::GoalStatus;

    fn profile_with(skills: &[(&str, f64)]) -> UserProfile {
        let mut profile = UserProfile::new("u1", "u1@example.com");
        for (concept, mastery) in skills {
            skill::apply_assessment(&mut profile.skill_levels, concept, *mastery, 0.5, Utc::now());
        }
        profile
    }

    fn goal(id: &str, priority: Priority, targets: &[&str], status: GoalStatus) -> LearningGoal {
        LearningGoal {
            id: id.into(),
            title: format!("Goal {id}"),
            description: String::new(),
            target_concepts: targets.iter().map(|t| t.to_string()).collect(),
            target_mastery: 0.8,
            deadline: None,
            priority,
            status,
        }
    }

    #[test]
    fn test_recommendations_order_and_cap() {
        let mut profile = profile_with(&[("a", 0.1), ("b", 0.2), ("c", 0.9), ("d", 0.95)]);
        profile.learning_goals.push(goal("g1", Priority::Low, &["a"], GoalStatus::Active));
        profile.learning_goals.push(goal("g2", Priority::High, &["b"], GoalStatus::Active));
        profile.learning_goals.push(goal("g3", Priority::High, &["b"], GoalStatus::Completed));

        let items = recommendations(&profile);
        assert_eq!(items.len(), 5);
        let titles: Vec<&str> = items.iter().map(|r| r.title.as_str()).collect();
        // with only four skills the weakest three reach into the strong ones
        assert_eq!(titles[..4], ["Review a", "Review b", "Review c", "Goal g2"]);
        assert!(items.iter().all(|r| r.title != "Goal g3"));
        assert_eq!(items[4].priority, Priority::Medium);
    }

    #[test]
    fn test_time_to_milestone() {
        let mut profile = profile_with(&[("a", 0.4), ("b", 0.6)]);
        assert_eq!(time_to_milestone(&profile, 0.1), 0.0);

        profile.learning_goals.push(goal("far", Priority::Low, &["a"], GoalStatus::Active));
        profile.learning_goals.push(goal("near", Priority::Low, &["b"], GoalStatus::Active));
        assert!((time_to_milestone(&profile, 0.1) - 2.0).abs() < 1e-9);
        assert_eq!(time_to_milestone(&profile, 0.0), UNREACHABLE_MILESTONE);

        profile.learning_goals.push(goal("empty", Priority::Low, &[], GoalStatus::Active));
        assert!((time_to_milestone(&profile, 0.1) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_study_frequency_bands() {
        assert_eq!(study_frequency(0.2), "Daily");
        assert_eq!(study_frequency(0.06), "3-4 times per week");
        assert_eq!(study_frequency(0.03), "2-3 times per week");
        assert_eq!(study_frequency(-1.0), "Weekly");
    }

    #[test]
    fn test_assess_low_confidence() {
        let mut level = skill::initial_skill_level("closures");
        level.mastery = 0.75;
        level.confidence = 0.3;
        let assessment = assess(level);
        assert!(assessment.readiness_for_advancement);
        assert_eq!(
            assessment.suggested_actions.last().unwrap(),
            "Build confidence through additional practice"
        );
    }

    #[test]
    fn test_achievements() {
        let summary = SessionSummary {
            session_id: "s1".into(),
            topic: "rust".into(),
            duration: 31 * 60,
            concepts_covered: vec![],
            mastered_concepts: vec!["rust-basics".into()],
            struggling_concepts: vec![],
            overall_accuracy: 0.85,
            recommended_next_steps: vec![],
        };
        assert_eq!(
            achievements(&summary),
            vec![
                "Great Job - 80%+ accuracy!",
                "Mastered 1 new concept(s)!",
                "Dedicated Learner - 30+ minute session!"
            ]
        );
    }
}
