mod locks;
pub mod personalization;
pub mod profile;
pub mod session;

use thiserror::Error;

pub use locks::KeyedLocks;
pub use personalization::{InMemoryPersonalizationStore, PersonalizationStore};
pub use profile::{InMemoryProfileRepository, ProfileRepository};
pub use session::{InMemorySessionRepository, SessionRecord, SessionRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record missing: {0}")]
    Missing(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
