use std::num::NonZeroUsize;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use super::RepositoryError;
use crate::adaptive::types::PersonalizationModel;

/// Keyed store for per-learner personalization records.
#[async_trait]
pub trait PersonalizationStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Option<PersonalizationModel>, RepositoryError>;
    async fn save(&self, model: PersonalizationModel) -> Result<(), RepositoryError>;
    /// Drops records untouched since `now - max_idle`.
    async fn evict_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> usize;
    async fn len(&self) -> usize;
}

/// LRU-bounded in-process store; the least recently used learner is dropped
/// once capacity is reached.
pub struct InMemoryPersonalizationStore {
    models: Mutex<LruCache<String, PersonalizationModel>>,
}

impl InMemoryPersonalizationStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            models: Mutex::new(LruCache::new(capacity)),
        }
    }
}

#[async_trait]
impl PersonalizationStore for InMemoryPersonalizationStore {
    async fn load(&self, user_id: &str) -> Result<Option<PersonalizationModel>, RepositoryError> {
        Ok(self.models.lock().get(user_id).cloned())
    }

    async fn save(&self, model: PersonalizationModel) -> Result<(), RepositoryError> {
        let user_id = model.user_id.clone();
        let displaced = self.models.lock().push(user_id.clone(), model);
        if let Some((evicted, _)) = displaced.filter(|(key, _)| *key != user_id) {
            debug!(user_id = %evicted, "Personalization record evicted at capacity");
        }
        Ok(())
    }

    async fn evict_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - max_idle;
        let mut models = self.models.lock();
        let idle: Vec<String> = models
            .iter()
            .filter(|(_, model)| model.last_active < cutoff)
            .map(|(user_id, _)| user_id.clone())
            .collect();
        for user_id in &idle {
            models.pop(user_id);
        }
        idle.len()
    }

    async fn len(&self) -> usize {
        self.models.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(user_id: &str, last_active: DateTime<Utc>) -> PersonalizationModel {
        let mut model = PersonalizationModel::new(user_id);
        model.last_active = last_active;
        model
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let store = InMemoryPersonalizationStore::new(2);
        let now = Utc::now();
        store.save(model("a", now)).await.unwrap();
        store.save(model("b", now)).await.unwrap();
        assert!(store.load("a").await.unwrap().is_some());

        store.save(model("c", now)).await.unwrap();
        assert_eq!(store.len().await, 2);
        assert!(store.load("b").await.unwrap().is_none());
        assert!(store.load("a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_resave_replaces_in_place() {
        let store = InMemoryPersonalizationStore::new(2);
        let now = Utc::now();
        store.save(model("a", now)).await.unwrap();
        store.save(model("b", now)).await.unwrap();

        let mut updated = model("a", now);
        updated.skill_levels.insert("rust".to_string(), 0.7);
        store.save(updated).await.unwrap();

        assert_eq!(store.len().await, 2);
        let loaded = store.load("a").await.unwrap().unwrap();
        assert_eq!(loaded.skill_levels.get("rust"), Some(&0.7));
        assert!(store.load("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_evict_idle_keeps_recent() {
        let store = InMemoryPersonalizationStore::new(8);
        let now = Utc::now();
        store.save(model("stale", now - Duration::hours(2))).await.unwrap();
        store.save(model("fresh", now)).await.unwrap();

        assert_eq!(store.evict_idle(Duration::hours(1), now).await, 1);
        assert!(store.load("stale").await.unwrap().is_none());
        assert!(store.load("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zero_capacity_still_holds_one() {
        let store = InMemoryPersonalizationStore::new(0);
        store.save(model("a", Utc::now())).await.unwrap();
        assert_eq!(store.len().await, 1);
    }
}
