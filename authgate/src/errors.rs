use crate::auth::session::SessionError;
use crate::db::errors::DbError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Malformed or missing input; the client has to fix the request
    #[error("{message}")]
    Validation { message: String },

    /// Password and its confirmation differ
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// A user with this username or email already exists
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Wrong login or password. Deliberately does not say which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Session missing, expired, or its store failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The secure random source failed
    #[error("Entropy source failure: {message}")]
    Entropy { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } | Error::PasswordMismatch => StatusCode::BAD_REQUEST,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::Session(session_err) => match session_err {
                SessionError::NotFound | SessionError::Expired => StatusCode::UNAUTHORIZED,
                SessionError::StoreTimeout(_) | SessionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Database(db_err) => match db_err {
                // A constraint clash that reached the boundary unconverted is still a conflict
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::NotFound | DbError::Timeout(_) | DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Entropy { .. } | Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { message } => message.clone(),
            Error::PasswordMismatch => "Passwords do not match".to_string(),
            Error::Conflict { message } => message.clone(),
            Error::InvalidCredentials => "Invalid credentials".to_string(),
            Error::Session(SessionError::NotFound | SessionError::Expired) => "Authentication required".to_string(),
            Error::Database(DbError::UniqueViolation { .. }) => "User with this username or email already exists".to_string(),
            Error::Session(_) | Error::Database(_) | Error::Entropy { .. } | Error::Internal { .. } | Error::Other(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Internal service error: {:#}", self);
        } else {
            match &self {
                Error::InvalidCredentials | Error::Session(_) => tracing::info!("Authentication error: {}", self),
                Error::Conflict { .. } | Error::Database(_) => tracing::warn!("Conflict error: {}", self),
                _ => tracing::debug!("Client error: {}", self),
            }
        }

        (status, Json(json!({ "message": self.user_message() }))).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
