use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;

/// A learner identity already verified by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub id: String,
}

impl AuthenticatedUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing identity")]
    MissingIdentity,
    #[error("identity rejected: {0}")]
    Rejected(String),
}

/// Turns an opaque credential into a verified user. Token formats live
/// entirely behind this trait.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<AuthenticatedUser, AuthError>;
}

/// Fixed credential table, for hosts that resolve identity upstream and for tests.
#[derive(Default)]
pub struct StaticIdentityVerifier {
    credentials: RwLock<HashMap<String, String>>,
}

impl StaticIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, credential: impl Into<String>, user_id: impl Into<String>) {
        self.credentials
            .write()
            .insert(credential.into(), user_id.into());
    }

    pub fn revoke(&self, credential: &str) -> bool {
        self.credentials.write().remove(credential).is_some()
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, credential: &str) -> Result<AuthenticatedUser, AuthError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(AuthError::MissingIdentity);
        }
        self.credentials
            .read()
            .get(credential)
            .map(AuthenticatedUser::new)
            .ok_or_else(|| AuthError::Rejected("unknown credential".to_string()))
    }
}
