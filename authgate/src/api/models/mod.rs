//! API request and response data models.
//!
//! These are the public JSON contract, kept apart from the storage records in
//! [`crate::db::models`]. All models derive `utoipa::ToSchema` for the generated docs.
//!
//! - [`auth`]: registration, login and logout payloads
//! - [`users`]: user listing and identity responses

pub mod auth;
pub mod users;
