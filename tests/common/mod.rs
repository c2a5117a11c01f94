#![allow(dead_code)]

use std::sync::Arc;

use tutor_core::auth::StaticIdentityVerifier;
use tutor_core::content::FixedSource;
use tutor_core::model::types::{
    DifficultyPreference, GoalStatus, LearningGoal, Priority, UserProfile,
};
use tutor_core::orchestrator::{LearningOrchestrator, OrchestratorSettings};
use tutor_core::storage::{InMemoryProfileRepository, InMemorySessionRepository};

pub struct Harness {
    pub orchestrator: LearningOrchestrator,
    pub profiles: Arc<InMemoryProfileRepository>,
    pub identity: Arc<StaticIdentityVerifier>,
}

pub fn harness() -> Harness {
    harness_with(OrchestratorSettings::default())
}

pub fn harness_with(settings: OrchestratorSettings) -> Harness {
    let profiles = Arc::new(InMemoryProfileRepository::new());
    let identity = Arc::new(StaticIdentityVerifier::new());
    let orchestrator = LearningOrchestrator::new(
        profiles.clone(),
        Arc::new(InMemorySessionRepository::new()),
        identity.clone(),
        settings,
    )
    .with_variant_source(Arc::new(FixedSource(0)));

    Harness {
        orchestrator,
        profiles,
        identity,
    }
}

pub fn learner(id: &str) -> UserProfile {
    UserProfile::new(id, format!("{id}@example.com"))
}

pub fn learner_with_preference(id: &str, preference: DifficultyPreference) -> UserProfile {
    let mut profile = learner(id);
    profile.preferences.difficulty_preference = preference;
    profile
}

pub fn goal(id: &str, targets: &[&str], priority: Priority) -> LearningGoal {
    LearningGoal {
        id: id.to_string(),
        title: format!("Finish {id}"),
        description: format!("Reach the target for {id}"),
        target_concepts: targets.iter().map(|t| t.to_string()).collect(),
        target_mastery: 0.8,
        deadline: None,
        priority,
        status: GoalStatus::Active,
    }
}
