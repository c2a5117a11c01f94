mod manager;
pub mod types;

pub use manager::{AppliedUpdate, SessionManager};
pub use types::{SessionConfig, SessionProgressReport, SessionSummary, SessionUpdate, UserSessionStats};

pub use crate::storage::{InMemorySessionRepository, SessionRecord, SessionRepository};
