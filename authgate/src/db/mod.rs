//! Database layer for data persistence and access.
//!
//! ```text
//! ┌──────────────────┐
//! │ Services         │  (auth::registration, auth::authentication, auth::session)
//! └────────┬─────────┘
//!          │  UserStore / SessionStore traits
//!          ↓
//! ┌──────────────────┐
//! │ Stores           │  (db::handlers - PostgreSQL or in-memory)
//! └────────┬─────────┘
//!          ↓
//! ┌──────────────────┐
//! │ PostgreSQL       │
//! └──────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: store traits and their implementations
//! - [`models`]: records passed between stores and services
//! - [`errors`]: storage error type
//!
//! # Migrations
//!
//! Schema migrations live in `migrations/` and are run by [`crate::migrator`] on startup.

pub mod errors;
pub mod handlers;
pub mod models;

use std::{future::Future, time::Duration};

use errors::DbError;

/// Run a store call with an upper bound on how long it may take.
///
/// Elapsed calls surface as [`DbError::Timeout`] instead of hanging the request.
pub async fn bounded<T, F>(limit: Duration, call: F) -> errors::Result<T>
where
    F: Future<Output = errors::Result<T>>,
{
    tokio::time::timeout(limit, call).await.map_err(|_| DbError::Timeout(limit))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_through_results() {
        let value = bounded(Duration::from_secs(1), async { Ok::<_, DbError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let result = bounded(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, DbError>(())
        })
        .await;

        assert!(matches!(result, Err(DbError::Timeout(d)) if d == Duration::from_millis(50)));
    }
}
