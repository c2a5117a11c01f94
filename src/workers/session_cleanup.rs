use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::orchestrator::LearningOrchestrator;

#[derive(Debug)]
struct CleanupStats {
    abandoned_sessions: usize,
    duration_secs: f64,
}

/// Abandons every active session older than the configured maximum age.
pub async fn abandon_expired_sessions(
    orchestrator: Arc<LearningOrchestrator>,
) -> Result<usize, super::WorkerError> {
    let start = Instant::now();
    debug!("Starting session cleanup cycle");

    let abandoned = orchestrator.sweep_expired_sessions().await?;
    let stats = CleanupStats {
        abandoned_sessions: abandoned.len(),
        duration_secs: start.elapsed().as_secs_f64(),
    };

    info!(
        abandoned_sessions = stats.abandoned_sessions,
        duration_secs = format!("{:.2}", stats.duration_secs),
        "Session cleanup completed"
    );

    Ok(stats.abandoned_sessions)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::auth::StaticIdentityVerifier;
    use crate::model::types::{SessionStatus, UserProfile};
    use crate::orchestrator::OrchestratorSettings;
    use crate::storage::{InMemoryProfileRepository, InMemorySessionRepository};

    #[tokio::test]
    async fn test_cleanup_with_zero_age_abandons_and_announces() {
        let profiles = Arc::new(InMemoryProfileRepository::new());
        profiles.insert(UserProfile::new("u1", "u1@example.com"));
        let settings = OrchestratorSettings {
            session_max_age: Duration::zero(),
            ..Default::default()
        };
        let orchestrator = Arc::new(LearningOrchestrator::new(
            profiles,
            Arc::new(InMemorySessionRepository::new()),
            Arc::new(StaticIdentityVerifier::new()),
            settings,
        ));
        let mut events = orchestrator.events().subscribe_global();

        let session = orchestrator
            .start_learning_session("u1", "javascript-basics")
            .await
            .unwrap();
        let _ = events.recv().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let abandoned = abandon_expired_sessions(Arc::clone(&orchestrator)).await.unwrap();
        assert_eq!(abandoned, 1);

        let ended = events.recv().await.unwrap();
        assert_eq!(ended.event.event_type(), "SESSION_ENDED");
        let stored = orchestrator.sessions().get_session(&session.id).await.unwrap();
        assert_eq!(stored.status, SessionStatus::Abandoned);
        assert!(stored.end_time.unwrap() <= Utc::now());
    }
}
