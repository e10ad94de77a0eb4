//! In-memory store implementations.
//!
//! Suitable for tests and single-process development. Nothing survives a restart and
//! sessions are not shared between processes, so production deployments use the
//! PostgreSQL stores.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{SessionStore, UserStore},
    models::{
        sessions::SessionDBRecord,
        users::{UserCreateDBRequest, UserDBResponse, UserSummary},
    },
};
use crate::types::{SessionToken, UserId};

/// In-memory user table.
///
/// Rows are kept in insertion order, which is also id order. The uniqueness check
/// and the insert happen under one write lock.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<Vec<UserDBResponse>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

fn unique_violation(constraint: &str) -> DbError {
    DbError::UniqueViolation {
        constraint: Some(constraint.to_string()),
        table: Some("users".to_string()),
        message: format!("duplicate key value violates unique constraint \"{constraint}\""),
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn exists(&self, identity: &str) -> Result<bool> {
        Ok(self
            .users
            .read()
            .iter()
            .any(|u| u.username == identity || u.email == identity))
    }

    async fn insert(&self, request: &UserCreateDBRequest) -> Result<UserId> {
        let mut users = self.users.write();

        if users.iter().any(|u| u.username == request.username) {
            return Err(unique_violation("users_username_unique"));
        }
        if users.iter().any(|u| u.email == request.email) {
            return Err(unique_violation("users_email_unique"));
        }

        let id = users.last().map_or(1, |u| u.id + 1);
        users.push(UserDBResponse {
            id,
            username: request.username.clone(),
            email: request.email.clone(),
            credential: request.credential.clone(),
            created_at: Utc::now(),
        });

        Ok(id)
    }

    async fn find_by_identity(&self, identity: &str) -> Result<UserDBResponse> {
        let users = self.users.read();
        users
            .iter()
            .find(|u| u.username == identity)
            .or_else(|| users.iter().find(|u| u.email == identity))
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>> {
        Ok(self
            .users
            .read()
            .iter()
            .map(|u| UserSummary {
                id: u.id,
                username: u.username.clone(),
            })
            .collect())
    }
}

/// In-memory session map keyed by token.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<SessionToken, SessionDBRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn issue(&self, session: &SessionDBRecord) -> Result<()> {
        self.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn resolve(&self, token: &SessionToken) -> Result<Option<SessionDBRecord>> {
        Ok(self.sessions.get(token).map(|entry| entry.value().clone()))
    }

    async fn rotate(&self, old: &SessionToken, replacement: &SessionDBRecord) -> Result<bool> {
        // Remove first: between the two calls neither token resolves, never both.
        let removed = self.sessions.remove(old).is_some();
        self.sessions.insert(replacement.token.clone(), replacement.clone());
        Ok(removed)
    }

    async fn destroy(&self, token: &SessionToken) -> Result<bool> {
        Ok(self.sessions.remove(token).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.is_live_at(now));
        Ok(before.saturating_sub(self.sessions.len()) as u64)
    }
}
