//! Credential verification and login.

use std::{sync::Arc, time::Duration};

use bon::Builder;
use tracing::{info, instrument};

use crate::{
    auth::{password::CredentialCodec, session::SessionManager},
    config::Config,
    db::{self, errors::DbError, handlers::UserStore, models::sessions::SessionDBRecord},
    errors::{Error, Result},
    types::{SessionToken, UserId},
};

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user_id: UserId,
    pub session: SessionDBRecord,
}

#[derive(Clone, Builder)]
pub struct Authenticator {
    users: Arc<dyn UserStore>,
    sessions: SessionManager,
    #[builder(default)]
    codec: CredentialCodec,
    #[builder(default = Duration::from_secs(5))]
    store_timeout: Duration,
}

impl Authenticator {
    /// Authenticator over `users` that starts sessions through `sessions`.
    pub fn from_config(config: &Config, users: Arc<dyn UserStore>, sessions: SessionManager) -> Self {
        Self::builder()
            .users(users)
            .sessions(sessions)
            .codec(config.auth.password.codec())
            .store_timeout(config.store_timeout)
            .build()
    }

    /// Check `password` for the user whose username or email is `identity`.
    ///
    /// Unknown identities and wrong passwords both yield [`Error::InvalidCredentials`],
    /// and both pay for exactly one hash.
    #[instrument(skip_all, err(level = "info"))]
    pub async fn authenticate(&self, identity: &str, password: &str) -> Result<UserId> {
        let user = match db::bounded(self.store_timeout, self.users.find_by_identity(identity)).await {
            Ok(user) => Some(user),
            Err(DbError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        let codec = self.codec;
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || -> Result<Option<UserId>> {
            match user {
                Some(user) => Ok(codec.verify(&password, &user.credential)?.then_some(user.id)),
                None => {
                    let dummy_salt = vec![0u8; codec.salt_length()];
                    codec.hash(&password, &dummy_salt)?;
                    Ok(None)
                }
            }
        })
        .await
        .map_err(|e| Error::Internal {
            operation: format!("join password verification task: {e}"),
        })??;

        verified.ok_or(Error::InvalidCredentials)
    }

    /// Authenticate, then bind a fresh session to the user.
    ///
    /// A `presented` token from an earlier session is rotated out rather than reused.
    #[instrument(skip_all, err(level = "info"))]
    pub async fn login(&self, identity: &str, password: &str, presented: Option<&SessionToken>) -> Result<LoginOutcome> {
        let user_id = self.authenticate(identity, password).await?;
        let session = self.sessions.issue_or_renew(user_id, presented).await?;

        info!(user_id, renewed = session.renewed, "Login successful");
        Ok(LoginOutcome { user_id, session })
    }
}
