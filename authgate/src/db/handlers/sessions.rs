//! PostgreSQL session store.
//!
//! Sessions live in the shared database so that every server process sees the same
//! set of live tokens. Rotation runs in a single transaction.

use crate::{
    db::{
        errors::Result,
        handlers::repository::SessionStore,
        models::sessions::SessionDBRecord,
    },
    types::{SessionToken, UserId, abbrev_token},
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct Session {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub renewed: bool,
}

impl From<Session> for SessionDBRecord {
    fn from(row: Session) -> Self {
        Self {
            token: SessionToken::new(row.token),
            user_id: row.user_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
            renewed: row.renewed,
        }
    }
}

#[derive(Clone)]
pub struct Sessions {
    db: PgPool,
}

impl Sessions {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const INSERT_SESSION: &str = r#"
    INSERT INTO sessions (token, user_id, created_at, expires_at, renewed)
    VALUES ($1, $2, $3, $4, $5)
"#;

#[async_trait::async_trait]
impl SessionStore for Sessions {
    #[instrument(skip(self, session), fields(user_id = session.user_id), err)]
    async fn issue(&self, session: &SessionDBRecord) -> Result<()> {
        sqlx::query(INSERT_SESSION)
            .bind(session.token.as_str())
            .bind(session.user_id)
            .bind(session.created_at)
            .bind(session.expires_at)
            .bind(session.renewed)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(token = %abbrev_token(token)), err)]
    async fn resolve(&self, token: &SessionToken) -> Result<Option<SessionDBRecord>> {
        let row = sqlx::query_as::<_, Session>(
            "SELECT token, user_id, created_at, expires_at, renewed FROM sessions WHERE token = $1",
        )
        .bind(token.as_str())
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, old, replacement), fields(old = %abbrev_token(old), user_id = replacement.user_id), err)]
    async fn rotate(&self, old: &SessionToken, replacement: &SessionDBRecord) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        let removed = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(old.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query(INSERT_SESSION)
            .bind(replacement.token.as_str())
            .bind(replacement.user_id)
            .bind(replacement.created_at)
            .bind(replacement.expires_at)
            .bind(replacement.renewed)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(removed > 0)
    }

    #[instrument(skip(self, token), fields(token = %abbrev_token(token)), err)]
    async fn destroy(&self, token: &SessionToken) -> Result<bool> {
        let removed = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token.as_str())
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(removed > 0)
    }

    #[instrument(skip(self), err)]
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(removed)
    }
}
