use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::registration::RegistrationRequest;
use crate::types::UserId;

/// Request to register a new user
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Username (must be unique)
    #[serde(default)]
    pub username: String,
    /// Email address (must be unique)
    #[serde(default)]
    pub email: String,
    /// Password (will be hashed)
    #[serde(default)]
    pub password: String,
    /// Optional confirmation; must equal `password` when given
    #[serde(default, alias = "passwordConfirm", skip_serializing_if = "Option::is_none")]
    pub password_confirm: Option<String>,
}

impl From<RegisterRequest> for RegistrationRequest {
    fn from(request: RegisterRequest) -> Self {
        Self {
            username: request.username,
            email: request.email,
            password: request.password,
            password_confirm: request.password_confirm,
        }
    }
}

/// Request to login
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username or email address
    #[serde(default)]
    pub login: String,
    /// Password
    #[serde(default)]
    pub password: String,
}

/// Body of a successful registration
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    /// Id assigned to the new user
    pub id: UserId,
    pub message: String,
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self)).into_response()
    }
}

/// Body of a successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: UserId,
    pub message: String,
}

/// Generic success response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthSuccessResponse {
    pub message: String,
}

/// Structured response for successful login
pub struct LoginResponse {
    pub auth_response: AuthResponse,
    pub cookie: HeaderValue,
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::SET_COOKIE, self.cookie);
        (StatusCode::OK, headers, Json(self.auth_response)).into_response()
    }
}

/// Structured response for successful logout
pub struct LogoutResponse {
    pub auth_response: AuthSuccessResponse,
    pub cookie: HeaderValue,
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::SET_COOKIE, self.cookie);
        (StatusCode::OK, headers, Json(self.auth_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_accepts_camel_case_confirm() {
        let request: RegisterRequest =
            serde_json::from_str(r#"{"username":"a","email":"a@x.com","password":"p","passwordConfirm":"p"}"#).unwrap();
        assert_eq!(request.password_confirm.as_deref(), Some("p"));

        let request: RegisterRequest =
            serde_json::from_str(r#"{"username":"a","email":"a@x.com","password":"p","password_confirm":"q"}"#).unwrap();
        assert_eq!(request.password_confirm.as_deref(), Some("q"));
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let request: RegisterRequest = serde_json::from_str(r#"{"username":"a"}"#).unwrap();
        assert!(request.email.is_empty());
        assert!(request.password.is_empty());
        assert!(request.password_confirm.is_none());
    }
}
