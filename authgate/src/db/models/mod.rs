//! Database record models.
//!
//! Plain structs passed between the stores and the services. They are kept apart
//! from the API models so credential material never reaches a serializer.
//!
//! - [`users`]: user accounts and their stored credentials
//! - [`sessions`]: server-side session records

pub mod sessions;
pub mod users;
