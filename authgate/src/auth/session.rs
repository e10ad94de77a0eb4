//! Server-side session management.
//!
//! A session is an opaque random token mapped to a user id in a [`SessionStore`]. The
//! client only ever holds the token (in the session cookie). Sessions expire a fixed
//! TTL after they were issued or renewed, and are rotated on every login so a token
//! planted before authentication never becomes authenticated.

use std::{sync::Arc, time::Duration};

use bon::Builder;
use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::{
    auth::password::generate_session_token,
    config::Config,
    db::{self, errors::DbError, handlers::SessionStore, models::sessions::SessionDBRecord},
    types::{SessionToken, UserId, abbrev_token},
};

#[derive(Error, Debug)]
pub enum SessionError {
    /// No session exists for the presented token
    #[error("Session not found")]
    NotFound,

    /// The session exists but its TTL has run out
    #[error("Session expired")]
    Expired,

    /// The session store did not answer in time
    #[error("Session store timed out after {0:?}")]
    StoreTimeout(Duration),

    #[error("Session store error: {0}")]
    Store(#[source] DbError),
}

impl From<DbError> for SessionError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Timeout(limit) => SessionError::StoreTimeout(limit),
            other => SessionError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Issues, renews, resolves and destroys sessions against a shared store.
#[derive(Clone, Builder)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    /// Lifetime of a session, counted from issuance or renewal.
    #[builder(default = Duration::from_secs(24 * 60 * 60))]
    ttl: Duration,
    /// Bound on every store call.
    #[builder(default = Duration::from_secs(5))]
    store_timeout: Duration,
}

impl SessionManager {
    /// Manager over `store` with the configured session lifetime and store timeout.
    pub fn from_config(config: &Config, store: Arc<dyn SessionStore>) -> Self {
        Self::builder()
            .store(store)
            .ttl(config.auth.session.timeout)
            .store_timeout(config.store_timeout)
            .build()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn new_record(&self, user_id: UserId, now: DateTime<Utc>, renewed: bool) -> Result<SessionDBRecord> {
        let expires_at = TimeDelta::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| SessionError::Store(DbError::Other(anyhow::anyhow!("session ttl {:?} out of range", self.ttl))))?;

        Ok(SessionDBRecord {
            token: generate_session_token(),
            user_id,
            created_at: now,
            expires_at,
            renewed,
        })
    }

    /// Bind a session to `user_id`.
    ///
    /// If `presented` names a live session it is rotated: the old token stops resolving
    /// in the same store operation that activates the new one. Otherwise a fresh session
    /// is issued. Either way the returned token is new.
    #[instrument(skip(self, presented), fields(presented = presented.is_some()), err)]
    pub async fn issue_or_renew(&self, user_id: UserId, presented: Option<&SessionToken>) -> Result<SessionDBRecord> {
        let now = Utc::now();

        let previous = match presented {
            Some(token) => db::bounded(self.store_timeout, self.store.resolve(token)).await?,
            None => None,
        };

        match previous {
            Some(previous) => {
                let renewed = previous.is_live_at(now);
                let record = self.new_record(user_id, now, renewed)?;
                // Expired tokens are swapped out too, so they don't linger until the next sweep
                db::bounded(self.store_timeout, self.store.rotate(&previous.token, &record)).await?;
                debug!(user_id, renewed, "Rotated session {}", abbrev_token(&previous.token));
                Ok(record)
            }
            None => {
                let record = self.new_record(user_id, now, false)?;
                db::bounded(self.store_timeout, self.store.issue(&record)).await?;
                debug!(user_id, "Issued new session");
                Ok(record)
            }
        }
    }

    /// Resolve a token to its user id.
    pub async fn resolve(&self, token: &SessionToken) -> Result<UserId> {
        self.resolve_at(token, Utc::now()).await
    }

    /// Resolve a token as of `now`. Live strictly before `expires_at`.
    pub async fn resolve_at(&self, token: &SessionToken, now: DateTime<Utc>) -> Result<UserId> {
        let record = db::bounded(self.store_timeout, self.store.resolve(token))
            .await?
            .ok_or(SessionError::NotFound)?;

        if !record.is_live_at(now) {
            return Err(SessionError::Expired);
        }

        Ok(record.user_id)
    }

    /// Invalidate a session. Destroying an unknown token is not an error.
    #[instrument(skip(self, token), fields(token = %abbrev_token(token)), err)]
    pub async fn destroy(&self, token: &SessionToken) -> Result<()> {
        db::bounded(self.store_timeout, self.store.destroy(token)).await?;
        Ok(())
    }

    /// Delete every expired session. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        Ok(db::bounded(self.store_timeout, self.store.purge_expired(Utc::now())).await?)
    }
}

/// Periodically purge expired sessions until `shutdown` is cancelled.
pub async fn run_session_sweeper(manager: SessionManager, interval: Duration, shutdown: CancellationToken) {
    tracing::info!(interval = ?interval, "Starting expired session sweeper");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.cancelled() => {
                tracing::info!("Session sweeper shutting down");
                return;
            }
        }

        match manager.purge_expired().await {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "Purged expired sessions"),
            Err(e) => tracing::warn!(error = %e, "Failed to purge expired sessions"),
        }
    }
}
