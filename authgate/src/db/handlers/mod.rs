//! Store implementations.
//!
//! The services depend on the [`UserStore`] and [`SessionStore`] traits only. Two
//! families of implementations exist:
//!
//! - [`Users`] and [`Sessions`]: PostgreSQL-backed, shared between server processes
//! - [`InMemoryUserStore`] and [`InMemorySessionStore`]: single-process, for tests and development
//!
//! # Usage
//!
//! ```ignore
//! use authgate::db::handlers::{Users, UserStore};
//!
//! async fn example(pool: sqlx::PgPool) -> anyhow::Result<()> {
//!     let users = Users::new(pool);
//!     if users.exists("alice").await? {
//!         println!("alice is taken");
//!     }
//!     Ok(())
//! }
//! ```

pub mod in_memory;
pub mod repository;
pub mod sessions;
pub mod users;

pub use in_memory::{InMemorySessionStore, InMemoryUserStore};
pub use repository::{SessionStore, UserStore};
pub use sessions::Sessions;
pub use users::Users;
