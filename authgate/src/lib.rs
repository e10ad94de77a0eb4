//! # authgate: credential authentication and server-side sessions
//!
//! `authgate` registers users, verifies their passwords and hands out opaque session
//! cookies that gate the rest of the API.
//!
//! ## Overview
//!
//! Passwords are never stored. Each account keeps a random per-user salt and the
//! Argon2id hash of the password under that salt ([`auth::password`]). A successful
//! login creates a server-side session keyed by a random token; the client only ever
//! holds that token in an `HttpOnly` cookie. Every protected request looks the token
//! up again ([`auth::middleware`]), so deleting a session row revokes it immediately.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum). Users always live in
//! PostgreSQL; sessions live either in PostgreSQL (shared between processes) or in
//! process memory, chosen by `auth.session.store`.
//!
//! ### Request Flow
//!
//! Public routes (`/api/auth/register`, `/api/auth/login`, `/healthz`, `/docs`) go
//! straight to their handler. Protected routes pass through
//! [`require_session`](auth::middleware::require_session) first, which resolves the
//! session cookie to a user id and stores it in the request extensions. Handlers call
//! into the services held by [`AppState`]:
//!
//! - [`RegistrationService`](auth::registration::RegistrationService) validates and creates accounts
//! - [`Authenticator`](auth::authentication::Authenticator) checks credentials and starts sessions
//! - [`SessionManager`](auth::session::SessionManager) owns the session lifecycle
//!
//! Expired sessions are rejected on lookup and periodically purged by a background
//! sweeper.
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    auth::{
        authentication::Authenticator,
        middleware::require_session,
        registration::RegistrationService,
        session::{SessionManager, run_session_sweeper},
    },
    config::{CorsOrigin, SessionStoreKind},
    db::handlers::{InMemorySessionStore, SessionStore, Sessions, UserStore, Users},
};
use axum::http::HeaderValue;
use axum::{
    Router, http,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, info, instrument, Level};
use utoipa_scalar::{Scalar, Servable};

pub use types::UserId;

/// Application state shared across all request handlers.
///
/// The services are cheap to clone; each holds `Arc`s to the underlying stores.
///
/// # Example
///
/// ```ignore
/// let sessions = SessionManager::from_config(&config, session_store);
/// let state = AppState::builder()
///     .registration(RegistrationService::from_config(&config, users.clone()))
///     .authenticator(Authenticator::from_config(&config, users.clone(), sessions.clone()))
///     .sessions(sessions)
///     .users(users)
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserStore>,
    pub sessions: SessionManager,
    pub registration: RegistrationService,
    pub authenticator: Authenticator,
}

/// Get the authgate database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Connect to PostgreSQL with the configured pool settings and run migrations.
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let database_url = config
        .database_url()
        .ok_or_else(|| anyhow::anyhow!("No database configured: set database.url or DATABASE_URL"))?;

    let settings = &config.database.pool;
    let mut options = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));

    // Zero disables the limit
    if settings.idle_timeout_secs > 0 {
        options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
    }
    if settings.max_lifetime_secs > 0 {
        options = options.max_lifetime(Duration::from_secs(settings.max_lifetime_secs));
    }

    let pool = options.connect(database_url).await?;
    migrator().run(&pool).await?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([http::Method::GET, http::Method::POST])
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_credentials(config.security.cors.allow_credentials);

    if let Some(max_age) = config.security.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router.
///
/// - `/api/auth/register`, `/api/auth/login`: public
/// - `/api/auth/logout`, `/api/users`, `/api/me`: behind [`require_session`]
/// - `/healthz`: liveness probe
/// - `/docs`: Scalar-rendered OpenAPI documentation
///
/// # Errors
///
/// Returns an error if the CORS configuration cannot be turned into header values.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let public_routes = Router::new()
        .route("/api/auth/register", post(api::handlers::auth::register))
        .route("/api/auth/login", post(api::handlers::auth::login));

    let protected_routes = Router::new()
        .route("/api/auth/logout", post(api::handlers::auth::logout))
        .route("/api/users", get(api::handlers::users::list_users))
        .route("/api/me", get(api::handlers::users::get_current_user))
        .layer(from_fn_with_state(state.clone(), require_session));

    let cors_layer = create_cors_layer(&state.config)?;
    let api_doc = openapi::api_doc(&state.config.auth.session.cookie_name);

    let router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .route("/healthz", get(|| async { "OK" }))
        .with_state(state)
        .merge(Scalar::with_url("/docs", api_doc))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(cors_layer),
        );

    Ok(router)
}

/// Background tasks that run alongside the HTTP server.
///
/// Dropping this without calling [`shutdown`](BackgroundServices::shutdown) still
/// cancels the tasks through the drop guard.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: CancellationToken,
    _drop_guard: tokio_util::sync::DropGuard,
}

impl BackgroundServices {
    /// Gracefully shutdown all background tasks
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();

        for handle in self.background_tasks {
            let _ = handle.await;
        }
    }
}

fn setup_background_services(state: &AppState, shutdown_token: CancellationToken) -> BackgroundServices {
    let drop_guard = shutdown_token.clone().drop_guard();

    let sweeper = tokio::spawn(run_session_sweeper(
        state.sessions.clone(),
        state.config.auth.session.sweep_interval,
        shutdown_token.clone(),
    ));

    BackgroundServices {
        background_tasks: vec![sweeper],
        shutdown_token,
        _drop_guard: drop_guard,
    }
}

/// Main application struct that owns all resources.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] connects to PostgreSQL, runs migrations, wires
///    the services and starts the session sweeper
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: when the shutdown future resolves, in-flight requests drain, the
///    sweeper stops and the pool closes
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    bg_services: BackgroundServices,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting authgate with configuration: {:#?}", config);

        let pool = setup_database(&config).await?;

        let users: Arc<dyn UserStore> = Arc::new(Users::new(pool.clone()));
        let session_store: Arc<dyn SessionStore> = match config.auth.session.store {
            SessionStoreKind::Postgres => Arc::new(Sessions::new(pool.clone())),
            SessionStoreKind::Memory => {
                info!("Keeping sessions in process memory; they will not survive a restart");
                Arc::new(InMemorySessionStore::new())
            }
        };

        let sessions = SessionManager::from_config(&config, session_store);
        let app_state = AppState::builder()
            .registration(RegistrationService::from_config(&config, users.clone()))
            .authenticator(Authenticator::from_config(&config, users.clone(), sessions.clone()))
            .sessions(sessions)
            .users(users)
            .config(config.clone())
            .build();
        let bg_services = setup_background_services(&app_state, CancellationToken::new());
        let router = build_router(app_state)?;

        Ok(Self {
            router,
            config,
            pool,
            bg_services,
        })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("authgate listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Stopping background tasks...");
        self.bg_services.shutdown().await;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{create_test_config, create_test_state, session_cookie_from};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;

    fn server() -> TestServer {
        TestServer::new(build_router(create_test_state()).unwrap()).unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_healthz() {
        let response = server().get("/healthz").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "OK");
    }

    #[test_log::test(tokio::test)]
    async fn test_docs_are_served() {
        server().get("/docs").await.assert_status_ok();
    }

    /// Register, log in, read a protected route, then log out and lose access.
    #[test_log::test(tokio::test)]
    async fn test_session_lifecycle_end_to_end() {
        let server = server();

        let registered = server
            .post("/api/auth/register")
            .json(&json!({"username": "alice", "email": "a@x.com", "password": "p1"}))
            .await;
        registered.assert_status(StatusCode::CREATED);

        let login = server
            .post("/api/auth/login")
            .json(&json!({"login": "alice", "password": "p1"}))
            .await;
        login.assert_status_ok();
        let cookie = session_cookie_from(&login);

        let users = server.get("/api/users").add_header("cookie", cookie.clone()).await;
        users.assert_status_ok();
        users.assert_json(&json!([{"id": 1, "username": "alice"}]));

        server
            .post("/api/auth/login")
            .json(&json!({"login": "alice", "password": "wrong"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server.get("/api/users").await.assert_status(StatusCode::UNAUTHORIZED);

        let logout = server.post("/api/auth/logout").add_header("cookie", cookie.clone()).await;
        logout.assert_status_ok();
        assert!(logout.header("set-cookie").to_str().unwrap().contains("Max-Age=0"));

        server
            .get("/api/users")
            .add_header("cookie", cookie)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[test_log::test(tokio::test)]
    async fn test_registration_can_be_disabled() {
        let mut config = create_test_config();
        config.auth.allow_registration = false;
        let server = TestServer::new(build_router(crate::test_utils::create_test_state_with_config(config)).unwrap()).unwrap();

        server
            .post("/api/auth/register")
            .json(&json!({"username": "alice", "email": "a@x.com", "password": "p1"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_cors_layer_from_config() {
        let config = create_test_config();
        assert!(create_cors_layer(&config).is_ok());
    }

    #[test_log::test(tokio::test)]
    async fn test_background_services_shutdown() {
        let state = create_test_state();
        let services = setup_background_services(&state, CancellationToken::new());
        tokio::time::timeout(Duration::from_secs(5), services.shutdown())
            .await
            .expect("sweeper did not stop");
    }
}
