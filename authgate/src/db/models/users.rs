//! Database models for users.

use crate::types::UserId;
use chrono::{DateTime, Utc};

/// Stored credential material for a user. Never serialized to clients.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub password_hash: Vec<u8>,
    pub salt: Vec<u8>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("password_hash", &"<redacted>")
            .field("salt_len", &self.salt.len())
            .finish()
    }
}

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub username: String,
    pub email: String,
    pub credential: Credential,
}

/// Full user record as stored
#[derive(Debug, Clone)]
pub struct UserDBResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub credential: Credential,
    pub created_at: DateTime<Utc>,
}

/// Listing projection: only what the protected listing exposes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
}
