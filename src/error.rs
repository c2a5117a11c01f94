use thiserror::Error;

use crate::auth::AuthError;
use crate::model::types::SessionStatus;
use crate::storage::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    InvalidState,
    Unauthorized,
    Storage,
}

#[derive(Debug, Error)]
pub enum LearningError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("concept not found: {0}")]
    ConceptNotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid mastery level: {0} (expected a value in [0, 1])")]
    InvalidMastery(f64),
    #[error("cannot {operation} session {session_id} while it is {status}")]
    InvalidState {
        session_id: String,
        status: SessionStatus,
        operation: &'static str,
    },
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl LearningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionNotFound(_) | Self::UserNotFound(_) | Self::ConceptNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::Validation(_) | Self::InvalidMastery(_) => ErrorKind::Validation,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Repository(_) => ErrorKind::Storage,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type LearningResult<T> = Result<T, LearningError>;
