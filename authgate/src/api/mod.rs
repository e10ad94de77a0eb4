//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - **Authentication** (`/api/auth/*`): register, login, logout
//! - **Users** (`/api/users`, `/api/me`): session-protected reads
//!
//! # OpenAPI Documentation
//!
//! Endpoints are documented with `utoipa`; the rendered docs are served at `/docs`.

pub mod handlers;
pub mod models;
