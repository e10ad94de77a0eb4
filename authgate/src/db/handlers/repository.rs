//! Store traits for users and sessions.
//!
//! Services only ever talk to these traits, so the backing store (PostgreSQL,
//! in-memory, or anything else) can be swapped without touching service logic.
//! Implementations must be safe for concurrent use from many request tasks.

use chrono::{DateTime, Utc};

use crate::db::errors::Result;
use crate::db::models::{
    sessions::SessionDBRecord,
    users::{UserCreateDBRequest, UserDBResponse, UserSummary},
};
use crate::types::{SessionToken, UserId};

/// Persistent user records.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// True if any user has `identity` as username OR email.
    async fn exists(&self, identity: &str) -> Result<bool>;

    /// Insert a new user and return its assigned id.
    ///
    /// Uniqueness of username and email is enforced here, atomically with the write;
    /// a clash is reported as [`DbError::UniqueViolation`](crate::db::errors::DbError::UniqueViolation).
    async fn insert(&self, request: &UserCreateDBRequest) -> Result<UserId>;

    /// Look a user up by username or email. A username match wins over an email match.
    async fn find_by_identity(&self, identity: &str) -> Result<UserDBResponse>;

    /// All users as `(id, username)`, ascending by id.
    async fn list_users(&self) -> Result<Vec<UserSummary>>;
}

/// Server-side session storage.
///
/// Backends used by more than one server process must be shared between them
/// (the PostgreSQL store is; the in-memory one is not).
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a freshly issued session.
    async fn issue(&self, session: &SessionDBRecord) -> Result<()>;

    /// Load a session by token, regardless of expiry.
    async fn resolve(&self, token: &SessionToken) -> Result<Option<SessionDBRecord>>;

    /// Atomically invalidate `old` and activate `replacement`.
    ///
    /// There is no point at which both tokens resolve. Returns whether `old` was still present.
    async fn rotate(&self, old: &SessionToken, replacement: &SessionDBRecord) -> Result<bool>;

    /// Remove a session. Idempotent; returns whether anything was removed.
    async fn destroy(&self, token: &SessionToken) -> Result<bool>;

    /// Remove every session that expired at or before `now`. Returns the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}
