//! Learner-facing façade over sessions, personalization and explanations.
//!
//! Every public operation returns a typed [`LearningError`] on failure and
//! publishes lifecycle events on the shared [`EventBus`] once its state
//! change is durable.

pub mod chat;
pub mod concepts;
pub mod explanation;
pub mod insights;

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::{Duration, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::adaptive::{
    DifficultyAdjustment, LearningMaterial, LearningPrediction, PacingRecommendation,
    PerformanceData, PersonalizationEngine, PersonalizedContent,
};
use crate::auth::{AuthenticatedUser, IdentityVerifier};
use crate::cache::keys;
use crate::content::{ContentGenerator, VariantSource};
use crate::core::{
    ConceptMasteredPayload, DifficultyAdjustedPayload, EventBus, LearningEvent,
    ProgressTrackedPayload, SessionEndedPayload, SessionStartedPayload,
};
use crate::error::{LearningError, LearningResult};
use crate::model::skill::{self, is_valid_mastery};
use crate::model::thresholds::DifficultyPolicy;
use crate::model::types::{
    LearningSession, PerformanceMetrics, SessionStatus, SkillLevel, UserProfile,
};
use crate::session::{
    SessionConfig, SessionManager, SessionProgressReport, SessionUpdate, UserSessionStats,
};
use crate::storage::{
    InMemoryPersonalizationStore, KeyedLocks, PersonalizationStore, ProfileRepository,
    SessionRepository,
};

pub use chat::{ChatContext, ChatIntent, ChatRequest, ChatResponse};
pub use concepts::ConceptLibrary;
pub use explanation::{Explanation, ExplanationContent, ExplanationRequest};
pub use insights::{
    CompletionReport, InsightsBundle, KnowledgeAssessment, Recommendation, RecommendationKind,
    StudySchedule,
};

/// Capacities and cutoffs for the in-process stores.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub session_max_age: Duration,
    pub history_cap: usize,
    pub explanation_cache_capacity: usize,
    pub model_capacity: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            session_max_age: Duration::hours(24),
            history_cap: 100,
            explanation_cache_capacity: 512,
            model_capacity: 10_000,
        }
    }
}

pub struct LearningOrchestrator {
    profiles: Arc<dyn ProfileRepository>,
    profile_locks: KeyedLocks,
    sessions: SessionManager,
    engine: PersonalizationEngine,
    content: ContentGenerator,
    explanations: Mutex<LruCache<String, Arc<Explanation>>>,
    concepts: ConceptLibrary,
    policy: Arc<DifficultyPolicy>,
    events: Arc<EventBus>,
    identity: Arc<dyn IdentityVerifier>,
}

impl LearningOrchestrator {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        sessions: Arc<dyn SessionRepository>,
        identity: Arc<dyn IdentityVerifier>,
        settings: OrchestratorSettings,
    ) -> Self {
        let policy = Arc::new(DifficultyPolicy::default());
        let store: Arc<dyn PersonalizationStore> =
            Arc::new(InMemoryPersonalizationStore::new(settings.model_capacity));

        Self {
            profiles,
            profile_locks: KeyedLocks::new(),
            sessions: SessionManager::new(sessions, settings.session_max_age),
            engine: PersonalizationEngine::new(store, Arc::clone(&policy), settings.history_cap),
            content: ContentGenerator::default(),
            explanations: Mutex::new(LruCache::new(
                NonZeroUsize::new(settings.explanation_cache_capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            concepts: ConceptLibrary::default(),
            policy,
            events: Arc::new(EventBus::new()),
            identity,
        }
    }

    /// Pins content variant selection, e.g. to a fixed source in tests.
    pub fn with_variant_source(mut self, source: Arc<dyn VariantSource>) -> Self {
        self.content = ContentGenerator::new(source);
        self
    }

    pub fn with_concepts(mut self, concepts: ConceptLibrary) -> Self {
        self.concepts = concepts;
        self
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn engine(&self) -> &PersonalizationEngine {
        &self.engine
    }

    pub fn concepts(&self) -> &ConceptLibrary {
        &self.concepts
    }

    pub fn explanation_cache_len(&self) -> usize {
        self.explanations.lock().len()
    }

    pub async fn authenticate(&self, credential: &str) -> LearningResult<AuthenticatedUser> {
        Ok(self.identity.verify(credential).await?)
    }

    async fn profile(&self, user_id: &str) -> LearningResult<UserProfile> {
        self.profiles
            .get(user_id)
            .await?
            .ok_or_else(|| LearningError::UserNotFound(user_id.to_string()))
    }

    /// Validates and stores a learner's profile, then mirrors its
    /// preferences into the engine.
    pub async fn update_profile(&self, mut profile: UserProfile) -> LearningResult<UserProfile> {
        skill::validate_profile(&profile).map_err(LearningError::Validation)?;

        {
            let _guard = self.profile_locks.acquire(&keys::user_lock_key(&profile.id)).await;
            profile.updated_at = Utc::now();
            self.profiles.update(profile.clone()).await?;
        }

        let preferences = &profile.preferences;
        self.engine
            .update_preferences(&profile.id, preferences.learning_style, preferences.clone())
            .await?;
        info!(user_id = %profile.id, "Profile updated");
        Ok(profile)
    }

    // ---- session lifecycle ----

    pub async fn start_learning_session(
        &self,
        user_id: &str,
        topic: &str,
    ) -> LearningResult<LearningSession> {
        let profile = self.profile(user_id).await?;
        let preferences = &profile.preferences;
        let stored = profile.skill_levels.get(topic).map(|skill| skill.mastery);
        let seeded = self
            .policy
            .seed_difficulty(stored, preferences.difficulty_preference);

        let mut config = SessionConfig::new(topic);
        // without evidence the learner starts easy but still sees the whole path
        match stored {
            Some(_) => config.preferred_difficulty = Some(seeded),
            None => config.initial_difficulty = Some(seeded),
        }
        config.max_duration = Some(preferences.session_length);
        config.learning_goals = profile
            .learning_goals
            .iter()
            .filter(|goal| goal.target_concepts.iter().any(|c| c == topic))
            .map(|goal| goal.id.clone())
            .collect();

        let session = self.sessions.create_session(user_id, config).await?;
        self.engine
            .update_preferences(user_id, preferences.learning_style, preferences.clone())
            .await?;

        self.events.publish(LearningEvent::SessionStarted(SessionStartedPayload {
            user_id: user_id.to_string(),
            session_id: session.id.clone(),
            topic: session.topic.clone(),
            difficulty: session.current_difficulty,
            planned_steps: session.progress.total_steps,
            timestamp: session.start_time,
        }));
        Ok(session)
    }

    pub async fn advance_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> LearningResult<LearningSession> {
        let applied = self.sessions.apply_update(session_id, update).await?;
        for concept in applied.newly_mastered {
            self.events.publish(LearningEvent::ConceptMastered(ConceptMasteredPayload {
                user_id: applied.session.user_id.clone(),
                session_id: session_id.to_string(),
                concept,
                timestamp: Utc::now(),
            }));
        }
        Ok(applied.session)
    }

    /// Runs the engine's adjustment for the session's current concept, moves
    /// the session difficulty when it changes, then records the sample.
    pub async fn adapt_difficulty(
        &self,
        session_id: &str,
        performance: PerformanceMetrics,
    ) -> LearningResult<DifficultyAdjustment> {
        if !is_valid_mastery(performance.accuracy) {
            return Err(LearningError::validation(format!(
                "accuracy {} is outside [0, 1]",
                performance.accuracy
            )));
        }

        let session = self.sessions.get_session(session_id).await?;
        if session.status != SessionStatus::Active {
            return Err(LearningError::InvalidState {
                session_id: session_id.to_string(),
                status: session.status,
                operation: "adapt difficulty of",
            });
        }
        let metrics = self.sessions.get_metrics(session_id).await?;

        let concept = session
            .current_concept()
            .map_or_else(|| session.topic.clone(), |node| node.id.clone());
        let mut data = PerformanceData::new(concept.clone(), performance.clone());
        data.session_id = Some(session_id.to_string());
        data.context = HashMap::from([
            (
                "currentDifficulty".to_string(),
                serde_json::json!(session.current_difficulty),
            ),
            (
                "sessionDurationSeconds".to_string(),
                serde_json::json!((Utc::now() - session.start_time).num_seconds().max(0)),
            ),
            ("hintsUsed".to_string(), serde_json::json!(metrics.hints_used)),
        ]);

        let adjustment = self.engine.adjust_difficulty(&session.user_id, &data).await?;

        if adjustment.to_level != session.current_difficulty {
            self.sessions
                .set_difficulty(session_id, adjustment.to_level)
                .await?;
            self.events.publish(LearningEvent::DifficultyAdjusted(DifficultyAdjustedPayload {
                user_id: session.user_id.clone(),
                session_id: Some(session_id.to_string()),
                concept,
                from_level: session.current_difficulty,
                to_level: adjustment.to_level,
                reason: adjustment.reason.clone(),
                timestamp: Utc::now(),
            }));
        }

        self.engine
            .record_performance(&session.user_id, performance.clone())
            .await?;
        self.sessions
            .update_session_metrics(session_id, &performance)
            .await?;
        Ok(adjustment)
    }

    pub async fn pause_session(&self, session_id: &str) -> LearningResult<LearningSession> {
        self.sessions.pause_session(session_id).await
    }

    pub async fn resume_session(&self, session_id: &str) -> LearningResult<LearningSession> {
        self.sessions.resume_session(session_id).await
    }

    pub async fn complete_session(&self, session_id: &str) -> LearningResult<CompletionReport> {
        let summary = self.sessions.complete_session(session_id).await?;
        let session = self.sessions.get_session(session_id).await?;
        self.publish_ended(&session, summary.duration);

        let achievements = insights::achievements(&summary);
        let next_recommendations = match self.profiles.get(&session.user_id).await? {
            Some(profile) => insights::recommendations(&profile),
            None => Vec::new(),
        };

        info!(
            session_id = %session_id,
            achievements = achievements.len(),
            accuracy = summary.overall_accuracy,
            "Session completed"
        );
        Ok(CompletionReport {
            summary,
            achievements,
            next_recommendations,
        })
    }

    pub async fn abandon_session(&self, session_id: &str) -> LearningResult<LearningSession> {
        let session = self.sessions.abandon_session(session_id).await?;
        let duration = self.sessions.get_metrics(session_id).await?.duration;
        self.publish_ended(&session, duration);
        Ok(session)
    }

    /// Abandons sessions past the maximum age and announces each one.
    pub async fn sweep_expired_sessions(&self) -> LearningResult<Vec<LearningSession>> {
        let abandoned = self.sessions.cleanup_expired_sessions().await?;
        for session in &abandoned {
            let duration = match self.sessions.get_metrics(&session.id).await {
                Ok(metrics) => metrics.duration,
                Err(_) => 0,
            };
            self.publish_ended(session, duration);
        }
        Ok(abandoned)
    }

    pub async fn cleanup_stale_models(&self, max_idle: Duration) -> usize {
        self.engine.cleanup_stale_models(max_idle).await
    }

    fn publish_ended(&self, session: &LearningSession, duration_seconds: u64) {
        self.events.publish(LearningEvent::SessionEnded(SessionEndedPayload {
            user_id: session.user_id.clone(),
            session_id: session.id.clone(),
            status: session.status,
            concepts_covered: session.progress.concepts_covered,
            duration_seconds,
            timestamp: session.end_time.unwrap_or_else(Utc::now),
        }));
    }

    pub async fn session_progress(&self, session_id: &str) -> LearningResult<SessionProgressReport> {
        self.sessions.session_progress(session_id).await
    }

    pub async fn user_active_sessions(&self, user_id: &str) -> LearningResult<Vec<LearningSession>> {
        self.sessions.user_active_sessions(user_id).await
    }

    pub async fn user_session_history(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> LearningResult<Vec<LearningSession>> {
        self.sessions.user_session_history(user_id, limit).await
    }

    pub async fn user_session_stats(&self, user_id: &str) -> LearningResult<UserSessionStats> {
        self.sessions.user_session_stats(user_id).await
    }

    // ---- skills and explanations ----

    /// Writes the assessment into the profile, then projects the profile's
    /// masteries into the engine.
    pub async fn track_progress(
        &self,
        user_id: &str,
        concept: &str,
        mastery: f64,
    ) -> LearningResult<SkillLevel> {
        if !is_valid_mastery(mastery) {
            return Err(LearningError::InvalidMastery(mastery));
        }
        if concept.trim().is_empty() {
            return Err(LearningError::validation("concept must not be empty"));
        }

        let skill = {
            // held through the engine projection so it sees writes in profile order
            let _guard = self.profile_locks.acquire(&keys::user_lock_key(user_id)).await;
            let mut profile = self.profile(user_id).await?;
            let now = Utc::now();
            let confidence = skill::assessment_confidence(mastery, profile.skill_levels.get(concept));
            let skill =
                skill::apply_assessment(&mut profile.skill_levels, concept, mastery, confidence, now);
            profile.updated_at = now;
            let masteries: Vec<(String, f64)> = profile
                .skill_levels
                .iter()
                .map(|(name, level)| (name.clone(), level.mastery))
                .collect();
            self.profiles.update(profile).await?;
            self.engine.sync_skill_levels(user_id, masteries).await?;
            skill
        };

        debug!(user_id = %user_id, concept = %concept, mastery, confidence = skill.confidence, "Progress tracked");
        self.events.publish(LearningEvent::ProgressTracked(ProgressTrackedPayload {
            user_id: user_id.to_string(),
            concept: concept.to_string(),
            mastery: skill.mastery,
            confidence: skill.confidence,
            timestamp: skill.last_assessed,
        }));
        Ok(skill)
    }

    /// Cached per (concept, mastery, confidence); a hit returns the same
    /// allocation as the first call.
    pub async fn generate_explanation(
        &self,
        concept: &str,
        level: &SkillLevel,
    ) -> LearningResult<Arc<Explanation>> {
        if !is_valid_mastery(level.mastery) {
            return Err(LearningError::InvalidMastery(level.mastery));
        }

        let key = keys::explanation_key(concept, level.mastery, level.confidence);
        let cached = self.explanations.lock().get(&key).cloned();
        if let Some(cached) = cached {
            debug!(concept = %concept, "Explanation cache hit");
            return Ok(cached);
        }

        let node = self
            .concepts
            .get(concept)
            .ok_or_else(|| LearningError::ConceptNotFound(concept.to_string()))?;
        let complexity = self.policy.explanation_complexity(level.mastery);
        let built = Arc::new(explanation::build(&self.content, node, level, complexity));

        let displaced = self.explanations.lock().push(key.clone(), Arc::clone(&built));
        if let Some((evicted, _)) = displaced.filter(|(displaced_key, _)| *displaced_key != key) {
            debug!(key = %evicted, "Explanation evicted from cache");
        }
        Ok(built)
    }

    pub async fn explain(&self, request: &ExplanationRequest) -> LearningResult<Explanation> {
        let cached = self
            .generate_explanation(&request.concept, &request.user_level)
            .await?;
        Ok(explanation::apply_request_options(
            cached.as_ref().clone(),
            request,
        ))
    }

    pub async fn assess_user_knowledge(
        &self,
        user_id: &str,
        concept: &str,
    ) -> LearningResult<KnowledgeAssessment> {
        let profile = self.profile(user_id).await?;
        let current = profile
            .skill_levels
            .get(concept)
            .cloned()
            .unwrap_or_else(|| skill::initial_skill_level(concept));
        Ok(insights::assess(current))
    }

    pub async fn personalized_recommendations(
        &self,
        user_id: &str,
    ) -> LearningResult<Vec<Recommendation>> {
        let profile = self.profile(user_id).await?;
        Ok(insights::recommendations(&profile))
    }

    pub async fn learning_insights(&self, user_id: &str) -> LearningResult<InsightsBundle> {
        let profile = self.profile(user_id).await?;
        let engine = self.engine.learning_insights(user_id).await?;
        let patterns = skill::identify_learning_patterns(&profile.progress_history);

        Ok(InsightsBundle {
            overall_progress: skill::overall_mastery(&profile.skill_levels),
            strengths: engine.strengths,
            weaknesses: engine.weaknesses,
            recommendations: insights::recommendations(&profile),
            learning_velocity: engine.learning_velocity,
            time_to_next_milestone: insights::time_to_milestone(&profile, engine.learning_velocity),
            optimal_study_schedule: StudySchedule {
                best_time_of_day: engine.optimal_study_time,
                recommended_session_length: patterns.average_session_length,
                suggested_frequency: insights::study_frequency(engine.learning_velocity)
                    .to_string(),
            },
        })
    }

    // ---- engine passthroughs ----

    pub async fn personalize_content(
        &self,
        user_id: &str,
        material: &LearningMaterial,
    ) -> LearningResult<PersonalizedContent> {
        self.engine.personalize_content(user_id, material).await
    }

    pub async fn predict_learning_outcome(
        &self,
        user_id: &str,
        concept: &str,
    ) -> LearningResult<LearningPrediction> {
        self.engine.predict_learning_outcome(user_id, concept).await
    }

    /// Pacing advice from the session's running metrics.
    pub async fn optimize_pacing(&self, session_id: &str) -> LearningResult<PacingRecommendation> {
        let session = self.sessions.get_session(session_id).await?;
        let metrics = self.sessions.get_metrics(session_id).await?;
        self.engine.optimize_pacing(&session.user_id, &metrics).await
    }

    // ---- tutor chat ----

    pub async fn process_chat_message(
        &self,
        user_id: &str,
        request: &ChatRequest,
    ) -> LearningResult<ChatResponse> {
        match chat::classify(&request.message) {
            ChatIntent::Greeting => Ok(chat::greeting()),
            ChatIntent::Explain(None) => Ok(chat::explain_prompt()),
            ChatIntent::Explain(Some(term)) => {
                let Some(node) = self.concepts.find(&term) else {
                    return Ok(chat::unknown_concept(&term));
                };
                let concept = node.id.clone();
                let level = match self.profiles.get(user_id).await? {
                    Some(profile) => profile.skill_levels.get(&concept).cloned(),
                    None => None,
                }
                .unwrap_or_else(|| skill::initial_skill_level(&concept));
                let explanation = self.generate_explanation(&concept, &level).await?;
                Ok(chat::explanation_found(&explanation.content.summary))
            }
            ChatIntent::Progress => {
                let bundle = self.learning_insights(user_id).await?;
                Ok(chat::progress(
                    bundle.learning_velocity,
                    &bundle.strengths,
                    &bundle.weaknesses,
                ))
            }
            ChatIntent::Help => Ok(chat::help()),
            ChatIntent::Other => Ok(chat::clarify(request.context.as_ref())),
        }
    }
}
