use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::trace;

use crate::{
    auth::session::SessionError,
    errors::Error,
    types::{SessionToken, UserId},
};

/// The user behind the current request's session.
///
/// Inserted into request extensions by [`require_session`](crate::auth::middleware::require_session)
/// and extracted from there by handlers. Extraction outside a protected router fails with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub token: SessionToken,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthenticatedUser>() {
            Some(user) => Ok(user.clone()),
            None => {
                trace!("No authenticated user in request extensions");
                Err(Error::Session(SessionError::NotFound))
            }
        }
    }
}
