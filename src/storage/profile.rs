use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::RepositoryError;
use crate::model::types::UserProfile;

/// Authoritative store for learner profiles (skill levels, preferences, goals).
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, RepositoryError>;
    async fn update(&self, profile: UserProfile) -> Result<(), RepositoryError>;
}

#[derive(Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: UserProfile) {
        self.profiles.write().insert(profile.id.clone(), profile);
    }

    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.profiles.read().get(user_id).cloned())
    }

    async fn update(&self, profile: UserProfile) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.write();
        match profiles.get_mut(&profile.id) {
            Some(existing) => {
                *existing = profile;
                Ok(())
            }
            None => Err(RepositoryError::Missing(format!("profile {}", profile.id))),
        }
    }
}
