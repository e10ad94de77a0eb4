//! Credential authentication and session management.
//!
//! # Flow
//!
//! 1. [`registration`] validates a sign-up, derives a salted Argon2id credential via
//!    [`password`] and stores the account.
//! 2. [`authentication`] looks the account up by username or email, re-derives the
//!    hash and compares it in constant time. Unknown accounts cost the same hash as
//!    known ones and fail with the same error.
//! 3. On success, [`session`] issues a random token (or rotates the one the client
//!    presented) with a fixed lifetime.
//! 4. [`middleware`] resolves the session cookie on every protected request and
//!    exposes the result through the [`current_user`] extractor.
//!
//! # Modules
//!
//! - [`authentication`]: credential checks and login
//! - [`current_user`]: extractor for the authenticated user in handlers
//! - [`middleware`]: route protection middleware
//! - [`password`]: salt generation, Argon2id hashing and verification
//! - [`registration`]: sign-up validation and account creation
//! - [`session`]: session issue, rotation, lookup, revocation and sweeping
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use authgate::auth::current_user::AuthenticatedUser;
//!
//! async fn protected_handler(user: AuthenticatedUser) -> String {
//!     format!("Hello, user {}!", user.user_id)
//! }
//! ```

pub mod authentication;
pub mod current_user;
pub mod middleware;
pub mod password;
pub mod registration;
pub mod session;
