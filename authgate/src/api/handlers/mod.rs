//! HTTP request handlers.
//!
//! Handlers deserialize the request, call into the services held by
//! [`AppState`](crate::AppState) and shape the response. Business rules live in
//! [`crate::auth`], not here.
//!
//! - [`auth`]: registration, login and logout, plus session cookie formatting
//! - [`users`]: user listing and the caller's identity (session required)
//!
//! Handlers return [`crate::errors::Error`], which converts to a status code and a
//! `{"message": ...}` JSON body.

pub mod auth;
pub mod users;
