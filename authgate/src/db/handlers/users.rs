//! PostgreSQL user store.

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::UserStore,
        models::users::{Credential, UserCreateDBRequest, UserDBResponse, UserSummary},
    },
    types::UserId,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::instrument;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: Vec<u8>,
    pub salt: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDBResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            credential: Credential {
                password_hash: user.password_hash,
                salt: user.salt,
            },
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct UserRow {
    pub id: UserId,
    pub username: String,
}

/// `users` table access. The unique constraints `users_username_unique` and
/// `users_email_unique` are what actually guarantee uniqueness.
#[derive(Clone)]
pub struct Users {
    db: PgPool,
}

impl Users {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl UserStore for Users {
    #[instrument(skip(self, identity), err)]
    async fn exists(&self, identity: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $1)")
            .bind(identity)
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }

    #[instrument(skip(self, request), fields(username = %request.username), err)]
    async fn insert(&self, request: &UserCreateDBRequest) -> Result<UserId> {
        let id: UserId = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, email, password_hash, salt)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&request.username)
        .bind(&request.email)
        .bind(&request.credential.password_hash)
        .bind(&request.credential.salt)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    #[instrument(skip(self, identity), err)]
    async fn find_by_identity(&self, identity: &str) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, salt, created_at
            FROM users
            WHERE username = $1 OR email = $1
            ORDER BY (username = $1) DESC, id ASC
            LIMIT 1
            "#,
        )
        .bind(identity)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user.into())
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT id, username FROM users ORDER BY id ASC")
            .fetch_all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| UserSummary {
                id: row.id,
                username: row.username,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> UserCreateDBRequest {
        UserCreateDBRequest {
            username: username.to_string(),
            email: email.to_string(),
            credential: Credential {
                password_hash: vec![7; 32],
                salt: vec![9; 32],
            },
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_insert_and_find(pool: PgPool) {
        let users = Users::new(pool);
        let id = users.insert(&new_user("alice", "a@x.com")).await.unwrap();

        let by_email = users.find_by_identity("a@x.com").await.unwrap();
        assert_eq!(by_email.id, id);
        assert_eq!(by_email.credential.password_hash, vec![7; 32]);
        assert_eq!(by_email.credential.salt, vec![9; 32]);

        assert!(users.exists("alice").await.unwrap());
        assert!(users.exists("a@x.com").await.unwrap());
        assert!(!users.exists("bob").await.unwrap());
        assert!(matches!(users.find_by_identity("bob").await, Err(DbError::NotFound)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_username_or_email_is_unique_violation(pool: PgPool) {
        let users = Users::new(pool);
        users.insert(&new_user("alice", "a@x.com")).await.unwrap();

        let err = users.insert(&new_user("alice", "other@x.com")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(err.conflicting_field(), Some("username"));

        let err = users.insert(&new_user("bob", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(err.conflicting_field(), Some("email"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_username_match_preferred_over_email(pool: PgPool) {
        let users = Users::new(pool);
        // alice's email is the literal username of the second account
        let by_email = users.insert(&new_user("alice", "carol")).await.unwrap();
        let by_username = users.insert(&new_user("carol", "c@x.com")).await.unwrap();
        assert_ne!(by_email, by_username);

        let found = users.find_by_identity("carol").await.unwrap();
        assert_eq!(found.id, by_username);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_users_ascending_by_id(pool: PgPool) {
        let users = Users::new(pool);
        let zed = users.insert(&new_user("zed", "z@x.com")).await.unwrap();
        let amy = users.insert(&new_user("amy", "a@x.com")).await.unwrap();

        let listed = users.list_users().await.unwrap();
        let ids: Vec<_> = listed.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![zed, amy]);
        assert_eq!(listed[0].username, "zed");
        assert_eq!(listed[1].username, "amy");
    }
}
