use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue},
};

use crate::{
    AppState,
    api::models::auth::{AuthResponse, AuthSuccessResponse, LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, RegisterResponse},
    auth::{current_user::AuthenticatedUser, middleware::session_token_from_headers},
    config::SessionConfig,
    errors::Error,
    types::SessionToken,
};

/// Unwrap a JSON body, answering 400 instead of axum's default rejection status.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Error> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            tracing::debug!("Rejected request body: {rejection}");
            Err(Error::Validation {
                message: "Invalid JSON provided".to_string(),
            })
        }
    }
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 400, description = "Invalid input or passwords do not match"),
        (status = 409, description = "User already exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, payload: Result<Json<RegisterRequest>, JsonRejection>) -> Result<RegisterResponse, Error> {
    let request = json_body(payload)?;
    let id = state.registration.register(request.into()).await?;

    Ok(RegisterResponse {
        id,
        message: "User created successfully".to_string(),
    })
}

/// Login with username or email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful; session cookie set", body = AuthResponse),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<LoginResponse, Error> {
    let request = json_body(payload)?;
    let session_config = &state.config.auth.session;

    // Any session the client already holds is rotated, never carried across the login
    let presented = session_token_from_headers(&headers, &session_config.cookie_name);

    let outcome = state
        .authenticator
        .login(&request.login, &request.password, presented.as_ref())
        .await?;

    let cookie = create_session_cookie(&outcome.session.token, session_config)?;

    Ok(LoginResponse {
        auth_response: AuthResponse {
            user_id: outcome.user_id,
            message: "Login successful".to_string(),
        },
        cookie,
    })
}

/// Logout (destroy the session and clear the cookie)
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
        (status = 401, description = "No valid session"),
    ),
    security(("SessionCookie" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = user.user_id))]
pub async fn logout(State(state): State<AppState>, user: AuthenticatedUser) -> Result<LogoutResponse, Error> {
    state.sessions.destroy(&user.token).await?;

    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie: clear_session_cookie(&state.config.auth.session)?,
    })
}

fn same_site_attribute(config: &SessionConfig) -> &'static str {
    match config.cookie_same_site.to_ascii_lowercase().as_str() {
        "strict" => "Strict",
        "none" => "None",
        _ => "Lax",
    }
}

fn cookie_header(config: &SessionConfig, value: &str, max_age: u64) -> Result<HeaderValue, Error> {
    let secure = if config.cookie_secure { "; Secure" } else { "" };
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}{}",
        config.cookie_name,
        value,
        same_site_attribute(config),
        max_age,
        secure
    );

    HeaderValue::from_str(&cookie).map_err(|e| Error::Internal {
        operation: format!("build session cookie: {e}"),
    })
}

/// `Set-Cookie` value carrying a session token for the configured lifetime.
pub fn create_session_cookie(token: &SessionToken, config: &SessionConfig) -> Result<HeaderValue, Error> {
    cookie_header(config, token.as_str(), config.timeout.as_secs())
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn clear_session_cookie(config: &SessionConfig) -> Result<HeaderValue, Error> {
    cookie_header(config, "", 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_config, create_test_state_with_config, session_cookie_from};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum_test::TestServer;
    use serde_json::json;
    use std::time::Duration;

    fn app(state: AppState) -> axum::Router {
        axum::Router::new()
            .route("/api/auth/register", post(register))
            .route("/api/auth/login", post(login))
            .with_state(state)
    }

    fn server() -> TestServer {
        TestServer::new(app(create_test_state_with_config(create_test_config()))).unwrap()
    }

    #[test]
    fn test_session_cookie_attributes() {
        let mut config = SessionConfig {
            timeout: Duration::from_secs(3600),
            ..Default::default()
        };
        let cookie = create_session_cookie(&SessionToken::new("abc"), &config).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "authgate_session=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600; Secure"
        );

        config.cookie_secure = false;
        config.cookie_same_site = "strict".to_string();
        let cookie = create_session_cookie(&SessionToken::new("abc"), &config).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "authgate_session=abc; Path=/; HttpOnly; SameSite=Strict; Max-Age=3600"
        );
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(&SessionConfig::default()).unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("authgate_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test_log::test(tokio::test)]
    async fn test_register_success() {
        let server = server();

        let response = server
            .post("/api/auth/register")
            .json(&json!({"username": "alice", "email": "a@x.com", "password": "p1"}))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: RegisterResponse = response.json();
        assert_eq!(body.id, 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_register_duplicate_conflicts() {
        let server = server();
        let body = json!({"username": "alice", "email": "a@x.com", "password": "p1"});

        server.post("/api/auth/register").json(&body).await.assert_status(StatusCode::CREATED);
        server.post("/api/auth/register").json(&body).await.assert_status(StatusCode::CONFLICT);
    }

    #[test_log::test(tokio::test)]
    async fn test_register_password_mismatch() {
        let server = server();

        let response = server
            .post("/api/auth/register")
            .json(&json!({"username": "alice", "email": "a@x.com", "password": "p1", "passwordConfirm": "p2"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"message": "Passwords do not match"}));
    }

    #[test_log::test(tokio::test)]
    async fn test_register_missing_fields() {
        let server = server();

        let response = server
            .post("/api/auth/register")
            .json(&json!({"username": "alice"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"message": "Username, email, and password are required"}));
    }

    #[test_log::test(tokio::test)]
    async fn test_malformed_json_is_bad_request() {
        let server = server();

        let response = server
            .post("/api/auth/login")
            .content_type("application/json")
            .bytes("{not json".into())
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"message": "Invalid JSON provided"}));
    }

    #[test_log::test(tokio::test)]
    async fn test_login_sets_cookie() {
        let server = server();
        server
            .post("/api/auth/register")
            .json(&json!({"username": "alice", "email": "a@x.com", "password": "p1"}))
            .await;

        let response = server
            .post("/api/auth/login")
            .json(&json!({"login": "a@x.com", "password": "p1"}))
            .await;
        response.assert_status_ok();

        let body: AuthResponse = response.json();
        assert_eq!(body.user_id, 1);

        let set_cookie = response.header("set-cookie");
        let set_cookie = set_cookie.to_str().unwrap();
        assert!(set_cookie.starts_with("authgate_session="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Max-Age=86400"));
    }

    #[test_log::test(tokio::test)]
    async fn test_login_wrong_password_and_unknown_user_match() {
        let server = server();
        server
            .post("/api/auth/register")
            .json(&json!({"username": "alice", "email": "a@x.com", "password": "p1"}))
            .await;

        let wrong_password = server
            .post("/api/auth/login")
            .json(&json!({"login": "alice", "password": "nope"}))
            .await;
        let unknown_user = server
            .post("/api/auth/login")
            .json(&json!({"login": "mallory", "password": "p1"}))
            .await;

        wrong_password.assert_status(StatusCode::UNAUTHORIZED);
        unknown_user.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.text(), unknown_user.text());
        assert!(wrong_password.maybe_header("set-cookie").is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_login_rotates_existing_session() {
        let state = create_test_state_with_config(create_test_config());
        let server = TestServer::new(app(state.clone())).unwrap();
        server
            .post("/api/auth/register")
            .json(&json!({"username": "alice", "email": "a@x.com", "password": "p1"}))
            .await;

        let first = server
            .post("/api/auth/login")
            .json(&json!({"login": "alice", "password": "p1"}))
            .await;
        let first_cookie = session_cookie_from(&first);

        let second = server
            .post("/api/auth/login")
            .add_header("cookie", first_cookie.clone())
            .json(&json!({"login": "alice", "password": "p1"}))
            .await;
        let second_cookie = session_cookie_from(&second);

        assert_ne!(first_cookie, second_cookie);
        let old_token = SessionToken::from(first_cookie.split_once('=').map(|(_, t)| t).unwrap());
        assert!(state.sessions.resolve(&old_token).await.is_err());
    }
}
