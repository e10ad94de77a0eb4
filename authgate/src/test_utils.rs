//! Test helpers: cheap-hashing config and in-memory application state.

use std::sync::Arc;

use crate::{
    AppState,
    auth::{
        authentication::Authenticator,
        registration::{RegistrationRequest, RegistrationService},
        session::SessionManager,
    },
    config::{Config, SessionStoreKind},
    db::handlers::{InMemorySessionStore, InMemoryUserStore, UserStore},
    types::UserId,
};

pub fn create_test_config() -> Config {
    let mut config = Config::default();

    // Minimal Argon2 cost keeps hashing out of the test runtime
    config.auth.password.argon2_memory_kib = 8;
    config.auth.password.argon2_iterations = 1;
    config.auth.password.argon2_parallelism = 1;
    config.auth.session.store = SessionStoreKind::Memory;

    config
}

pub fn create_test_state() -> AppState {
    create_test_state_with_config(create_test_config())
}

pub fn create_test_state_with_config(config: Config) -> AppState {
    let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
    let sessions = SessionManager::from_config(&config, Arc::new(InMemorySessionStore::new()));

    AppState::builder()
        .registration(RegistrationService::from_config(&config, users.clone()))
        .authenticator(Authenticator::from_config(&config, users.clone(), sessions.clone()))
        .sessions(sessions)
        .users(users)
        .config(config)
        .build()
}

/// Register a user, log them in, and return their id with a `Cookie` header value.
pub async fn login_cookie(state: &AppState, username: &str, email: &str, password: &str) -> (UserId, String) {
    let id = state
        .registration
        .register(RegistrationRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            password_confirm: None,
        })
        .await
        .expect("Failed to register test user");

    let outcome = state
        .authenticator
        .login(username, password, None)
        .await
        .expect("Failed to log in test user");

    let cookie = format!("{}={}", state.config.auth.session.cookie_name, outcome.session.token.as_str());
    (id, cookie)
}

/// `name=value` part of a response's `Set-Cookie` header.
pub fn session_cookie_from(response: &axum_test::TestResponse) -> String {
    let header = response.header("set-cookie");
    let header = header.to_str().expect("Set-Cookie is not ASCII");
    header.split(';').next().unwrap_or_default().to_string()
}
