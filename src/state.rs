use std::sync::Arc;
use std::time::Instant;

use crate::auth::{IdentityVerifier, StaticIdentityVerifier};
use crate::config::Config;
use crate::orchestrator::LearningOrchestrator;
use crate::storage::{InMemoryProfileRepository, InMemorySessionRepository, ProfileRepository};

/// Process-wide wiring: in-memory repositories behind the orchestrator.
#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    orchestrator: Arc<LearningOrchestrator>,
    profiles: Arc<InMemoryProfileRepository>,
    identity: Arc<StaticIdentityVerifier>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let profiles = Arc::new(InMemoryProfileRepository::new());
        let identity = Arc::new(StaticIdentityVerifier::new());
        let profile_repo: Arc<dyn ProfileRepository> = profiles.clone();
        let verifier: Arc<dyn IdentityVerifier> = identity.clone();
        let orchestrator = Arc::new(LearningOrchestrator::new(
            profile_repo,
            Arc::new(InMemorySessionRepository::new()),
            verifier,
            config.orchestrator_settings(),
        ));

        Self {
            started_at: Instant::now(),
            orchestrator,
            profiles,
            identity,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn orchestrator(&self) -> Arc<LearningOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// Direct handle for seeding profiles; the orchestrator reads through the trait.
    pub fn profiles(&self) -> Arc<InMemoryProfileRepository> {
        Arc::clone(&self.profiles)
    }

    pub fn identity(&self) -> Arc<StaticIdentityVerifier> {
        Arc::clone(&self.identity)
    }
}
