use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::RepositoryError;
use crate::model::types::{LearningSession, SessionMetrics, SessionStatus};

/// A session together with its metrics row.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub session: LearningSession,
    pub metrics: SessionMetrics,
}

/// Persisted CRUD for sessions and their metrics, keyed by session id.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Inserts the session and its initial metrics as one unit; nothing is
    /// written when the id already exists.
    async fn create(
        &self,
        session: &LearningSession,
        metrics: &SessionMetrics,
    ) -> Result<(), RepositoryError>;

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, RepositoryError>;

    async fn save_session(&self, session: &LearningSession) -> Result<(), RepositoryError>;

    async fn save_metrics(
        &self,
        session_id: &str,
        metrics: &SessionMetrics,
    ) -> Result<(), RepositoryError>;

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<SessionRecord>, RepositoryError>;

    async fn list_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<LearningSession>, RepositoryError>;
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(
        &self,
        session: &LearningSession,
        metrics: &SessionMetrics,
    ) -> Result<(), RepositoryError> {
        let mut records = self.records.write();
        if records.contains_key(&session.id) {
            return Err(RepositoryError::Conflict(format!("session {}", session.id)));
        }
        records.insert(
            session.id.clone(),
            SessionRecord {
                session: session.clone(),
                metrics: metrics.clone(),
            },
        );
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, RepositoryError> {
        Ok(self.records.read().get(session_id).cloned())
    }

    async fn save_session(&self, session: &LearningSession) -> Result<(), RepositoryError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&session.id)
            .ok_or_else(|| RepositoryError::Missing(format!("session {}", session.id)))?;
        record.session = session.clone();
        Ok(())
    }

    async fn save_metrics(
        &self,
        session_id: &str,
        metrics: &SessionMetrics,
    ) -> Result<(), RepositoryError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(session_id)
            .ok_or_else(|| RepositoryError::Missing(format!("session {session_id}")))?;
        record.metrics = metrics.clone();
        Ok(())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<SessionRecord>, RepositoryError> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|record| record.session.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<LearningSession>, RepositoryError> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|record| record.session.status == status)
            .map(|record| record.session.clone())
            .collect())
    }
}
