use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::cache::keys;
use crate::error::{LearningError, LearningResult};
use crate::model::skill::is_valid_mastery;
use crate::model::types::{
    ConceptNode, DifficultyLevel, LearningSession, PerformanceMetrics, ProgressState,
    SessionMetrics, SessionStatus,
};
use crate::storage::{KeyedLocks, SessionRecord, SessionRepository};

use super::types::{
    SessionConfig, SessionProgressReport, SessionSummary, SessionUpdate, UserSessionStats,
};

const STRUGGLING_BELOW: f64 = 0.4;
const MASTERED_FROM: f64 = 0.8;
const ENGAGEMENT_STEP: f64 = 0.1;
const ENGAGEMENT_FLOOR: f64 = 0.1;
const LOW_SUMMARY_ACCURACY: f64 = 0.6;
const HIGH_SUMMARY_ACCURACY: f64 = 0.8;

/// Result of an update, with the concepts that crossed into mastery during it.
#[derive(Debug, Clone)]
pub struct AppliedUpdate {
    pub session: LearningSession,
    pub metrics: SessionMetrics,
    pub newly_mastered: Vec<String>,
}

/// Owns the session state machine. Every read-modify-write on a session runs
/// under that session's lock, including the expiry sweep.
pub struct SessionManager {
    repo: Arc<dyn SessionRepository>,
    locks: KeyedLocks,
    max_age: Duration,
}

impl SessionManager {
    pub fn new(repo: Arc<dyn SessionRepository>, max_age: Duration) -> Self {
        Self {
            repo,
            locks: KeyedLocks::new(),
            max_age,
        }
    }

    async fn load(&self, session_id: &str) -> LearningResult<SessionRecord> {
        self.repo
            .get(session_id)
            .await?
            .ok_or_else(|| LearningError::SessionNotFound(session_id.to_string()))
    }

    pub async fn create_session(
        &self,
        user_id: &str,
        config: SessionConfig,
    ) -> LearningResult<LearningSession> {
        let topic = config.topic.trim();
        if topic.is_empty() {
            return Err(LearningError::validation("topic must not be empty"));
        }
        if user_id.trim().is_empty() {
            return Err(LearningError::validation("user id must not be empty"));
        }

        let learning_path = build_learning_path(topic, config.preferred_difficulty);
        let session = LearningSession {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            topic: topic.to_string(),
            current_difficulty: config
                .initial_difficulty
                .or(config.preferred_difficulty)
                .unwrap_or(DifficultyLevel::Intermediate),
            progress: ProgressState::new(learning_path.len()),
            learning_path,
            start_time: Utc::now(),
            end_time: None,
            status: SessionStatus::Active,
            max_duration: config.max_duration,
            learning_goals: config.learning_goals,
        };

        self.repo
            .create(&session, &SessionMetrics::default())
            .await?;

        info!(
            session_id = %session.id,
            user_id = %user_id,
            topic = %session.topic,
            difficulty = %session.current_difficulty,
            steps = session.progress.total_steps,
            "Learning session created"
        );
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> LearningResult<LearningSession> {
        Ok(self.load(session_id).await?.session)
    }

    pub async fn get_metrics(&self, session_id: &str) -> LearningResult<SessionMetrics> {
        Ok(self.load(session_id).await?.metrics)
    }

    pub async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> LearningResult<LearningSession> {
        Ok(self.apply_update(session_id, update).await?.session)
    }

    /// [`update_session`](Self::update_session) that also reports metrics and
    /// newly mastered concepts.
    pub async fn apply_update(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> LearningResult<AppliedUpdate> {
        if let Some(ref performance) = update.performance {
            validate_performance(performance)?;
        }

        let _guard = self.locks.acquire(&keys::session_lock_key(session_id)).await;
        let SessionRecord {
            mut session,
            mut metrics,
        } = self.load(session_id).await?;
        require_active(&session, "update")?;

        let mastered_before: HashSet<String> =
            session.progress.mastered_concepts.iter().cloned().collect();

        if let Some(step) = update.current_step {
            if step > session.progress.total_steps {
                return Err(LearningError::validation(format!(
                    "step {step} is beyond the {} steps of session {session_id}",
                    session.progress.total_steps
                )));
            }
            session.progress.current_step = step;
            if let Some(node) = session.learning_path.get(step) {
                let concept = node.id.clone();
                if session.progress.mark_completed(&concept) {
                    session.progress.concepts_covered += 1;
                    metrics.concepts_covered = session.progress.concepts_covered;
                }
            }
        }

        if let Some(ref performance) = update.performance {
            fold_performance(&mut metrics, performance.accuracy);
            if let Some(concept) = session.current_concept().map(|node| node.id.clone()) {
                classify(&mut session.progress, &concept, performance.accuracy);
            }
        }

        if let Some(seconds) = update.time_spent {
            metrics.duration = metrics.duration.saturating_add(seconds);
        }
        if let Some(hints) = update.hints_used {
            metrics.hints_used = metrics.hints_used.saturating_add(hints);
        }

        self.repo.save_session(&session).await?;
        self.repo.save_metrics(session_id, &metrics).await?;

        let newly_mastered = session
            .progress
            .mastered_concepts
            .iter()
            .filter(|concept| !mastered_before.contains(*concept))
            .cloned()
            .collect();

        debug!(
            session_id = %session_id,
            step = session.progress.current_step,
            accuracy = metrics.average_accuracy,
            "Session updated"
        );
        Ok(AppliedUpdate {
            session,
            metrics,
            newly_mastered,
        })
    }

    /// Folds one observation into the running accuracy and engagement.
    pub async fn update_session_metrics(
        &self,
        session_id: &str,
        performance: &PerformanceMetrics,
    ) -> LearningResult<SessionMetrics> {
        validate_performance(performance)?;

        let _guard = self.locks.acquire(&keys::session_lock_key(session_id)).await;
        let mut record = self.load(session_id).await?;
        fold_performance(&mut record.metrics, performance.accuracy);
        self.repo.save_metrics(session_id, &record.metrics).await?;
        Ok(record.metrics)
    }

    pub async fn set_difficulty(
        &self,
        session_id: &str,
        level: DifficultyLevel,
    ) -> LearningResult<LearningSession> {
        let _guard = self.locks.acquire(&keys::session_lock_key(session_id)).await;
        let mut session = self.load(session_id).await?.session;
        require_active(&session, "adjust difficulty of")?;
        if session.current_difficulty != level {
            session.current_difficulty = level;
            self.repo.save_session(&session).await?;
        }
        Ok(session)
    }

    pub async fn pause_session(&self, session_id: &str) -> LearningResult<LearningSession> {
        self.transition(session_id, SessionStatus::Paused, "pause")
            .await
            .map(|record| record.session)
    }

    pub async fn resume_session(&self, session_id: &str) -> LearningResult<LearningSession> {
        self.transition(session_id, SessionStatus::Active, "resume")
            .await
            .map(|record| record.session)
    }

    pub async fn complete_session(&self, session_id: &str) -> LearningResult<SessionSummary> {
        let record = self
            .transition(session_id, SessionStatus::Completed, "complete")
            .await?;
        Ok(summarize(&record.session, &record.metrics))
    }

    pub async fn abandon_session(&self, session_id: &str) -> LearningResult<LearningSession> {
        self.transition(session_id, SessionStatus::Abandoned, "abandon")
            .await
            .map(|record| record.session)
    }

    async fn transition(
        &self,
        session_id: &str,
        target: SessionStatus,
        operation: &'static str,
    ) -> LearningResult<SessionRecord> {
        let _guard = self.locks.acquire(&keys::session_lock_key(session_id)).await;
        let mut record = self.load(session_id).await?;
        let from = record.session.status;

        if !from.can_transition_to(target) {
            warn!(session_id = %session_id, status = %from, operation, "Rejected session transition");
            return Err(LearningError::InvalidState {
                session_id: session_id.to_string(),
                status: from,
                operation,
            });
        }

        record.session.status = target;
        if target.is_terminal() {
            record.session.end_time = Some(Utc::now());
        }
        self.repo.save_session(&record.session).await?;

        info!(session_id = %session_id, from = %from, to = %target, "Session status changed");
        Ok(record)
    }

    /// Session-level mastery bookkeeping for an explicit assessment.
    pub async fn track_concept_mastery(
        &self,
        session_id: &str,
        concept: &str,
        mastery: f64,
    ) -> LearningResult<LearningSession> {
        if !is_valid_mastery(mastery) {
            return Err(LearningError::InvalidMastery(mastery));
        }

        let _guard = self.locks.acquire(&keys::session_lock_key(session_id)).await;
        let mut session = self.load(session_id).await?.session;
        if session.status.is_terminal() {
            return Err(LearningError::InvalidState {
                session_id: session_id.to_string(),
                status: session.status,
                operation: "track mastery in",
            });
        }

        classify(&mut session.progress, concept, mastery);
        session.progress.mark_completed(concept);
        self.repo.save_session(&session).await?;
        Ok(session)
    }

    pub async fn session_progress(&self, session_id: &str) -> LearningResult<SessionProgressReport> {
        let session = self.get_session(session_id).await?;
        Ok(progress_report(&session, Utc::now()))
    }

    pub async fn progress_percentage(&self, session_id: &str) -> LearningResult<f64> {
        Ok(self.get_session(session_id).await?.progress.percentage())
    }

    pub async fn user_active_sessions(&self, user_id: &str) -> LearningResult<Vec<LearningSession>> {
        let mut sessions: Vec<LearningSession> = self
            .repo
            .list_by_user(user_id)
            .await?
            .into_iter()
            .map(|record| record.session)
            .filter(|session| session.status == SessionStatus::Active)
            .collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }

    /// Non-active sessions, most recently ended first.
    pub async fn user_session_history(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> LearningResult<Vec<LearningSession>> {
        let mut sessions: Vec<LearningSession> = self
            .repo
            .list_by_user(user_id)
            .await?
            .into_iter()
            .map(|record| record.session)
            .filter(|session| session.status != SessionStatus::Active)
            .collect();
        sessions.sort_by(|a, b| {
            b.end_time
                .cmp(&a.end_time)
                .then_with(|| b.start_time.cmp(&a.start_time))
        });
        if let Some(limit) = limit {
            sessions.truncate(limit);
        }
        Ok(sessions)
    }

    pub async fn user_session_stats(&self, user_id: &str) -> LearningResult<UserSessionStats> {
        let records = self.repo.list_by_user(user_id).await?;
        if records.is_empty() {
            return Ok(UserSessionStats::default());
        }

        let total_sessions = records.len();
        let completed_sessions = records
            .iter()
            .filter(|record| record.session.status == SessionStatus::Completed)
            .count();
        let total_seconds: u64 = records.iter().map(|record| record.metrics.duration).sum();
        let total_study_time = total_seconds as f64 / 60.0;
        let mastered: HashSet<&str> = records
            .iter()
            .flat_map(|record| record.session.progress.mastered_concepts.iter())
            .map(String::as_str)
            .collect();
        let accuracy_sum: f64 = records
            .iter()
            .map(|record| record.metrics.average_accuracy)
            .sum();

        Ok(UserSessionStats {
            total_sessions,
            completed_sessions,
            total_study_time,
            average_session_length: total_study_time / total_sessions as f64,
            concepts_mastered: mastered.len(),
            average_accuracy: accuracy_sum / total_sessions as f64,
        })
    }

    pub async fn cleanup_expired_sessions(&self) -> LearningResult<Vec<LearningSession>> {
        self.cleanup_expired_sessions_at(Utc::now()).await
    }

    /// Abandons every session still active that started before `now - max_age`.
    pub async fn cleanup_expired_sessions_at(
        &self,
        now: DateTime<Utc>,
    ) -> LearningResult<Vec<LearningSession>> {
        let cutoff = now - self.max_age;
        let candidates: Vec<String> = self
            .repo
            .list_by_status(SessionStatus::Active)
            .await?
            .into_iter()
            .filter(|session| session.start_time < cutoff)
            .map(|session| session.id)
            .collect();

        let mut abandoned = Vec::with_capacity(candidates.len());
        for session_id in candidates {
            let _guard = self.locks.acquire(&keys::session_lock_key(&session_id)).await;
            // re-read: a concurrent transition may have won the lock first
            let Some(mut record) = self.repo.get(&session_id).await? else {
                continue;
            };
            if record.session.status != SessionStatus::Active || record.session.start_time >= cutoff {
                continue;
            }
            record.session.status = SessionStatus::Abandoned;
            record.session.end_time = Some(now);
            self.repo.save_session(&record.session).await?;
            abandoned.push(record.session);
        }
        self.locks.prune();

        if !abandoned.is_empty() {
            info!(count = abandoned.len(), "Expired sessions abandoned");
        }
        Ok(abandoned)
    }

    pub async fn active_sessions_count(&self) -> LearningResult<usize> {
        Ok(self.repo.list_by_status(SessionStatus::Active).await?.len())
    }

    pub async fn all_active_sessions(&self) -> LearningResult<Vec<LearningSession>> {
        Ok(self.repo.list_by_status(SessionStatus::Active).await?)
    }
}

fn require_active(session: &LearningSession, operation: &'static str) -> LearningResult<()> {
    if session.status == SessionStatus::Active {
        return Ok(());
    }
    warn!(session_id = %session.id, status = %session.status, operation, "Rejected session operation");
    Err(LearningError::InvalidState {
        session_id: session.id.clone(),
        status: session.status,
        operation,
    })
}

fn validate_performance(performance: &PerformanceMetrics) -> LearningResult<()> {
    if !is_valid_mastery(performance.accuracy) {
        return Err(LearningError::validation(format!(
            "accuracy {} is outside [0, 1]",
            performance.accuracy
        )));
    }
    Ok(())
}

pub(crate) fn build_learning_path(
    topic: &str,
    preferred: Option<DifficultyLevel>,
) -> Vec<ConceptNode> {
    let stages = [
        ("basics", "Basics", format!("Introduction to {topic}"), DifficultyLevel::Beginner),
        (
            "intermediate",
            "Intermediate",
            format!("Intermediate concepts in {topic}"),
            DifficultyLevel::Intermediate,
        ),
        (
            "advanced",
            "Advanced",
            format!("Advanced topics in {topic}"),
            DifficultyLevel::Advanced,
        ),
    ];
    let depth = match preferred {
        Some(DifficultyLevel::Beginner) => 1,
        Some(DifficultyLevel::Intermediate) => 2,
        _ => stages.len(),
    };

    let mut path: Vec<ConceptNode> = Vec::with_capacity(depth);
    for (suffix, label, description, difficulty) in stages.into_iter().take(depth) {
        let prerequisites = path.last().map(|prev| vec![prev.id.clone()]).unwrap_or_default();
        path.push(ConceptNode {
            id: format!("{topic}-{suffix}"),
            name: format!("{topic} {label}"),
            description,
            prerequisites,
            difficulty,
        });
    }
    path
}

fn classify(progress: &mut ProgressState, concept: &str, score: f64) {
    if score < STRUGGLING_BELOW {
        progress.mark_struggling(concept);
    } else if score >= MASTERED_FROM {
        progress.mark_mastered(concept);
    }
}

fn fold_performance(metrics: &mut SessionMetrics, accuracy: f64) {
    let n = metrics.exercises_completed as f64;
    metrics.average_accuracy = (metrics.average_accuracy * n + accuracy) / (n + 1.0);
    metrics.exercises_completed = metrics.exercises_completed.saturating_add(1);

    if accuracy > MASTERED_FROM {
        metrics.engagement_score = (metrics.engagement_score + ENGAGEMENT_STEP).min(1.0);
    } else if accuracy < STRUGGLING_BELOW {
        metrics.engagement_score = (metrics.engagement_score - ENGAGEMENT_STEP).max(ENGAGEMENT_FLOOR);
    }
}

fn summarize(session: &LearningSession, metrics: &SessionMetrics) -> SessionSummary {
    let progress = &session.progress;
    let mut steps = Vec::new();

    if progress.struggling_concepts.is_empty() {
        steps.push("Continue to more advanced topics".to_string());
    } else {
        steps.push(format!(
            "Review struggling concepts: {}",
            progress.struggling_concepts.join(", ")
        ));
    }

    if metrics.average_accuracy < LOW_SUMMARY_ACCURACY {
        steps.push("Consider reviewing prerequisite concepts".to_string());
    } else if metrics.average_accuracy > HIGH_SUMMARY_ACCURACY {
        steps.push("Ready for challenging material".to_string());
    }

    SessionSummary {
        session_id: session.id.clone(),
        topic: session.topic.clone(),
        duration: metrics.duration,
        concepts_covered: progress.completed_concepts.clone(),
        mastered_concepts: progress.mastered_concepts.clone(),
        struggling_concepts: progress.struggling_concepts.clone(),
        overall_accuracy: metrics.average_accuracy,
        recommended_next_steps: steps,
    }
}

fn progress_report(session: &LearningSession, now: DateTime<Utc>) -> SessionProgressReport {
    let progress = &session.progress;
    let elapsed_minutes = (now - session.start_time).num_seconds().max(0) as f64 / 60.0;
    let per_step = elapsed_minutes / (progress.current_step + 1) as f64;
    let remaining_steps = progress
        .total_steps
        .saturating_sub(progress.current_step + 1);

    SessionProgressReport {
        session_id: session.id.clone(),
        progress: progress.clone(),
        percentage: progress.percentage(),
        estimated_time_remaining: per_step * remaining_steps as f64,
        next_concept: session.learning_path.get(progress.current_step + 1).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::InMemorySessionRepository;

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(InMemorySessionRepository::new()), Duration::hours(24))
    }

    #[test]
    fn test_learning_path_depth_follows_preference() {
        assert_eq!(build_learning_path("rust", Some(DifficultyLevel::Beginner)).len(), 1);
        assert_eq!(build_learning_path("rust", Some(DifficultyLevel::Intermediate)).len(), 2);
        assert_eq!(build_learning_path("rust", Some(DifficultyLevel::Expert)).len(), 3);

        let path = build_learning_path("rust", None);
        assert_eq!(path[2].id, "rust-advanced");
        assert_eq!(path[2].name, "rust Advanced");
        assert_eq!(path[2].prerequisites, vec!["rust-intermediate"]);
        assert!(path[0].prerequisites.is_empty());
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let manager = manager();
        let session = manager
            .create_session("u1", SessionConfig::new("rust"))
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.current_difficulty, DifficultyLevel::Intermediate);
        assert_eq!(session.progress.total_steps, 3);

        let metrics = manager.get_metrics(&session.id).await.unwrap();
        assert_eq!(metrics.engagement_score, 1.0);
        assert_eq!(metrics.exercises_completed, 0);
    }

    #[tokio::test]
    async fn test_empty_topic_rejected() {
        let err = manager()
            .create_session("u1", SessionConfig::new("   "))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_advancing_is_idempotent() {
        let manager = manager();
        let session = manager
            .create_session("u1", SessionConfig::new("rust"))
            .await
            .unwrap();

        manager.update_session(&session.id, SessionUpdate::step(1)).await.unwrap();
        let updated = manager
            .update_session(&session.id, SessionUpdate::step(1))
            .await
            .unwrap();
        assert_eq!(updated.progress.completed_concepts, vec!["rust-intermediate"]);
        assert_eq!(updated.progress.concepts_covered, 1);

        let err = manager
            .update_session(&session.id, SessionUpdate::step(4))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_accuracy_reclassifies_current_concept() {
        let manager = manager();
        let session = manager
            .create_session("u1", SessionConfig::new("rust"))
            .await
            .unwrap();

        let low = manager
            .update_session(
                &session.id,
                SessionUpdate::performance(PerformanceMetrics::with_accuracy(0.2)),
            )
            .await
            .unwrap();
        assert_eq!(low.progress.struggling_concepts, vec!["rust-basics"]);

        let applied = manager
            .apply_update(
                &session.id,
                SessionUpdate::performance(PerformanceMetrics::with_accuracy(0.9)),
            )
            .await
            .unwrap();
        assert!(applied.session.progress.struggling_concepts.is_empty());
        assert_eq!(applied.newly_mastered, vec!["rust-basics"]);
        assert!((applied.metrics.average_accuracy - 0.55).abs() < 1e-10);
        assert_eq!(applied.metrics.exercises_completed, 2);
        // 1.0 -> 0.9 on the miss, back to 1.0 on the hit
        assert!((applied.metrics.engagement_score - 1.0).abs() < 1e-10);
    }

    #[tokio::test]
    async fn test_engagement_floor() {
        let manager = manager();
        let session = manager
            .create_session("u1", SessionConfig::new("rust"))
            .await
            .unwrap();
        let mut metrics = SessionMetrics::default();
        for _ in 0..15 {
            metrics = manager
                .update_session_metrics(&session.id, &PerformanceMetrics::with_accuracy(0.1))
                .await
                .unwrap();
        }
        assert!((metrics.engagement_score - 0.1).abs() < 1e-10);
        assert_eq!(metrics.exercises_completed, 15);
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let manager = manager();
        let session = manager
            .create_session("u1", SessionConfig::new("rust"))
            .await
            .unwrap();

        let err = manager.resume_session(&session.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        manager.pause_session(&session.id).await.unwrap();
        let err = manager
            .update_session(&session.id, SessionUpdate::step(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let resumed = manager.resume_session(&session.id).await.unwrap();
        assert_eq!(resumed.status, SessionStatus::Active);

        let summary = manager.complete_session(&session.id).await.unwrap();
        // a fresh metrics record sits at zero accuracy
        assert_eq!(
            summary.recommended_next_steps,
            vec![
                "Continue to more advanced topics",
                "Consider reviewing prerequisite concepts"
            ]
        );
        assert_eq!(summary.overall_accuracy, 0.0);
        let completed = manager.get_session(&session.id).await.unwrap();
        assert!(completed.end_time.is_some());

        for result in [
            manager.resume_session(&session.id).await,
            manager.pause_session(&session.id).await,
            manager.abandon_session(&session.id).await,
        ] {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidState);
        }
    }

    #[tokio::test]
    async fn test_summary_suggests_review() {
        let manager = manager();
        let session = manager
            .create_session("u1", SessionConfig::new("rust"))
            .await
            .unwrap();
        manager
            .update_session(
                &session.id,
                SessionUpdate::performance(PerformanceMetrics::with_accuracy(0.3)),
            )
            .await
            .unwrap();

        let summary = manager.complete_session(&session.id).await.unwrap();
        assert_eq!(summary.struggling_concepts, vec!["rust-basics"]);
        assert_eq!(
            summary.recommended_next_steps,
            vec![
                "Review struggling concepts: rust-basics",
                "Consider reviewing prerequisite concepts"
            ]
        );
    }

    #[tokio::test]
    async fn test_summary_suggests_challenge() {
        let manager = manager();
        let session = manager
            .create_session("u1", SessionConfig::new("rust"))
            .await
            .unwrap();
        for accuracy in [0.9, 0.95] {
            manager
                .update_session(
                    &session.id,
                    SessionUpdate::performance(PerformanceMetrics::with_accuracy(accuracy)),
                )
                .await
                .unwrap();
        }

        let summary = manager.complete_session(&session.id).await.unwrap();
        assert!(summary.struggling_concepts.is_empty());
        assert!((summary.overall_accuracy - 0.925).abs() < 1e-9);
        assert_eq!(
            summary.recommended_next_steps,
            vec![
                "Continue to more advanced topics",
                "Ready for challenging material"
            ]
        );
    }

    #[tokio::test]
    async fn test_sweep_abandons_only_expired_active() {
        let manager = manager();
        let old = manager
            .create_session("u1", SessionConfig::new("rust"))
            .await
            .unwrap();
        let paused = manager
            .create_session("u1", SessionConfig::new("go"))
            .await
            .unwrap();
        manager.pause_session(&paused.id).await.unwrap();

        let later = Utc::now() + Duration::hours(25);
        let abandoned = manager.cleanup_expired_sessions_at(later).await.unwrap();
        assert_eq!(abandoned.len(), 1);
        assert_eq!(abandoned[0].id, old.id);
        assert_eq!(abandoned[0].end_time, Some(later));

        assert!(manager.cleanup_expired_sessions().await.unwrap().is_empty());
        assert_eq!(manager.active_sessions_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_track_concept_mastery_and_stats() {
        let manager = manager();
        let session = manager
            .create_session("u1", SessionConfig::new("rust"))
            .await
            .unwrap();

        let err = manager
            .track_concept_mastery(&session.id, "ownership", 1.2)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let updated = manager
            .track_concept_mastery(&session.id, "ownership", 0.85)
            .await
            .unwrap();
        assert!(updated.progress.is_mastered("ownership"));
        assert!(updated.progress.completed_concepts.contains(&"ownership".to_string()));

        manager
            .update_session(
                &session.id,
                SessionUpdate {
                    time_spent: Some(600),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        manager.complete_session(&session.id).await.unwrap();

        let stats = manager.user_session_stats("u1").await.unwrap();
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.completed_sessions, 1);
        assert_eq!(stats.concepts_mastered, 1);
        assert!((stats.total_study_time - 10.0).abs() < 1e-10);

        let history = manager.user_session_history("u1", Some(5)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(manager.user_session_stats("nobody").await.unwrap(), UserSessionStats::default());
    }

    #[tokio::test]
    async fn test_progress_report_points_at_next_concept() {
        let manager = manager();
        let session = manager
            .create_session("u1", SessionConfig::new("rust"))
            .await
            .unwrap();
        let report = manager.session_progress(&session.id).await.unwrap();
        assert_eq!(report.next_concept.unwrap().id, "rust-intermediate");
        assert_eq!(report.percentage, 0.0);
        assert!(report.estimated_time_remaining >= 0.0);

        let missing = manager.session_progress("nope").await.unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }
}
