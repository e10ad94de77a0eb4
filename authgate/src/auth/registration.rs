//! User registration.

use std::{sync::Arc, time::Duration};

use bon::Builder;
use tracing::{info, instrument, warn};

use crate::{
    auth::password::{CredentialCodec, OsSaltSource, SaltSource},
    config::Config,
    db::{self, errors::DbError, handlers::UserStore, models::users::UserCreateDBRequest},
    errors::{Error, Result},
    types::UserId,
};

const DUPLICATE_USER_MESSAGE: &str = "User with this username or email already exists";

/// Input to [`RegistrationService::register`].
#[derive(Clone)]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: Option<String>,
}

impl std::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Accepted password lengths, in characters.
#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 1,
            max_length: 128,
        }
    }
}

#[derive(Clone, Builder)]
pub struct RegistrationService {
    users: Arc<dyn UserStore>,
    #[builder(default)]
    codec: CredentialCodec,
    #[builder(default)]
    policy: PasswordPolicy,
    #[builder(default = true)]
    allow_registration: bool,
    #[builder(default = Duration::from_secs(5))]
    store_timeout: Duration,
    #[builder(default = Arc::new(OsSaltSource))]
    salt_source: Arc<dyn SaltSource>,
}

impl RegistrationService {
    /// Service over `users` with the configured password rules and store timeout.
    pub fn from_config(config: &Config, users: Arc<dyn UserStore>) -> Self {
        Self::builder()
            .users(users)
            .codec(config.auth.password.codec())
            .policy(config.auth.password.policy())
            .allow_registration(config.auth.allow_registration)
            .store_timeout(config.store_timeout)
            .build()
    }

    fn validate(&self, request: &RegistrationRequest) -> Result<()> {
        if request.username.is_empty() || request.email.is_empty() || request.password.is_empty() {
            return Err(Error::Validation {
                message: "Username, email, and password are required".to_string(),
            });
        }

        let length = request.password.chars().count();
        if length < self.policy.min_length {
            return Err(Error::Validation {
                message: format!("Password must be at least {} characters long", self.policy.min_length),
            });
        }
        if length > self.policy.max_length {
            return Err(Error::Validation {
                message: format!("Password must be no more than {} characters long", self.policy.max_length),
            });
        }

        if let Some(confirm) = &request.password_confirm
            && confirm != &request.password
        {
            return Err(Error::PasswordMismatch);
        }

        Ok(())
    }

    /// Create a user and return the id the store assigned.
    ///
    /// Nothing is written unless every check passes. Two concurrent registrations for
    /// the same username or email produce exactly one user: the store's uniqueness
    /// constraint decides, the lookup before hashing only saves work.
    #[instrument(skip_all, fields(username = %request.username), err)]
    pub async fn register(&self, request: RegistrationRequest) -> Result<UserId> {
        if !self.allow_registration {
            return Err(Error::Validation {
                message: "User registration is disabled".to_string(),
            });
        }

        self.validate(&request)?;

        let taken = db::bounded(self.store_timeout, self.users.exists(&request.username)).await?
            || db::bounded(self.store_timeout, self.users.exists(&request.email)).await?;
        if taken {
            warn!("Registration rejected: username or email already exists");
            return Err(Error::Conflict {
                message: DUPLICATE_USER_MESSAGE.to_string(),
            });
        }

        let codec = self.codec;
        let salt_source = self.salt_source.clone();
        let password = request.password;
        let credential = tokio::task::spawn_blocking(move || codec.derive_from(salt_source.as_ref(), &password))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("join password hashing task: {e}"),
            })??;

        let new_user = UserCreateDBRequest {
            username: request.username,
            email: request.email,
            credential,
        };

        let id = match db::bounded(self.store_timeout, self.users.insert(&new_user)).await {
            Ok(id) => id,
            Err(e @ DbError::UniqueViolation { .. }) => {
                warn!(field = e.conflicting_field(), "Registration lost a uniqueness race");
                return Err(Error::Conflict {
                    message: DUPLICATE_USER_MESSAGE.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        info!(user_id = id, "Registered new user");
        Ok(id)
    }
}
