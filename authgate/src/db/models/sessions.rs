//! Database models for server-side sessions.

use crate::types::{SessionToken, UserId};
use chrono::{DateTime, Utc};

/// A server-side session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDBRecord {
    pub token: SessionToken,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Whether this session replaced an earlier token on login
    pub renewed: bool,
}

impl SessionDBRecord {
    /// Live strictly before `expires_at`; expired at or after it.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
