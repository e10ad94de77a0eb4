//! Common type definitions.
//!
//! - [`UserId`]: store-assigned user identifier (monotonic, starts at 1)
//! - [`SessionToken`]: opaque session identifier carried in the session cookie
//!
//! # Utility Functions
//!
//! - [`abbrev_token`]: Abbreviate session tokens to their first 8 chars for logging

use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for IDs
pub type UserId = i64;

/// Opaque session token.
///
/// The `Debug` impl only prints an abbreviation so tokens never land in logs in full.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({}…)", abbrev_token(self))
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Abbreviate a session token to its first 8 characters for readable, non-leaking logs
pub fn abbrev_token(token: &SessionToken) -> String {
    token.0.chars().take(8).collect()
}
